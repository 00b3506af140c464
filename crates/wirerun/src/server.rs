//! # Server
//!
//! Serves a `ServerContext` over any number of connections.
//!
//! Each connection gets one task that reads a request, dispatches it to completion and writes the
//! response before reading the next. Handlers therefore never run concurrently on one connection,
//! while separate connections share the context and its handle tables.

use std::io;
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::task::JoinHandle;

use wirerpc::Dispatcher;
use wirerpc::registry;

use crate::config::ServerConfig;
use crate::context::ServerContext;
use crate::handlers;
use crate::transport;
use crate::transport::StreamTransport;
use crate::transport::Transport;
use crate::transport::TransportConfig;

pub struct Server {
    context: ServerContext,
    dispatcher: Dispatcher<ServerContext>,
}

impl Server {
    /// Builds a context and registers every endpoint.
    pub fn new(config: ServerConfig) -> registry::Result<Self> {
        Ok(Self { context: ServerContext::new(config), dispatcher: handlers::dispatcher()? })
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    pub fn dispatcher(&self) -> &Dispatcher<ServerContext> {
        &self.dispatcher
    }

    /// Serves one connection until the peer closes it.
    pub async fn serve(&self, transport: &dyn Transport) -> transport::Result<()> {
        while let Some(request) = transport.recv().await? {
            match self.dispatcher.dispatch_bytes(&self.context, &request) {
                Some(response) => transport.send(&response).await?,
                None => tracing::debug!(len = request.len(), "frame produced no response"),
            }
        }
        Ok(())
    }

    /// Serves one connection on a background task, logging how it ended.
    pub fn spawn(self: &Arc<Self>, transport: Box<dyn Transport>) -> JoinHandle<()> {
        let server = self.clone();
        tokio::spawn(async move {
            match server.serve(transport.as_ref()).await {
                Ok(()) => tracing::info!("client disconnected"),
                Err(e) => tracing::warn!(error = %e, "connection ended with an error"),
            }
        })
    }

    /// Accepts Unix socket connections forever.
    pub async fn listen(self: Arc<Self>, listener: UnixListener, config: TransportConfig) -> io::Result<()> {
        loop {
            let (stream, _addr) = listener.accept().await?;
            tracing::info!("client connected");
            let transport = StreamTransport::unix(stream).with_config(config);
            self.spawn(Box::new(transport));
        }
    }
}

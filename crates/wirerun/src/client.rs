//! # Client Call Façade
//!
//! Gives callers a blocking `call_synchronous` on top of an asynchronous transport.
//!
//! ## Design
//!
//! Each `Client` owns one connection and two tasks:
//! - a **writer** that drains an outbound queue into `Transport::send`, and
//! - a **pump** that reads responses and completes the matching pending call.
//!
//! A pending call is a `oneshot` sender keyed by correlation id. The calling thread parks on the
//! receiving half. When the connection goes away the pump marks the client disconnected and drops
//! every pending sender, which wakes each waiter with an empty result list.
//!
//! ## Invariants
//! - A correlation id is used for exactly one request per client.
//! - A caller is woken exactly once: by its own response, or by disconnection.
//! - `call_synchronous` must not be called from inside an async task; it parks the thread.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use wirepack::Value;
use wirerpc::CallError;
use wirerpc::Frame;
use wirerpc::Request;
use wirerpc::decode_correlation_id;
use wirerpc::status;

use crate::endpoint::Endpoint;
use crate::transport::Transport;

/// State shared between the client handle and its background tasks.
struct Shared {
    pending: DashMap<u64, oneshot::Sender<Vec<Value>>>,
    connected: AtomicBool,
}

impl Shared {
    /// Marks the connection dead and wakes every waiter with an empty result.
    fn shutdown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let keys: Vec<u64> = self.pending.iter().map(|e| *e.key()).collect();
        for key in keys {
            // Dropping the sender wakes the receiver with an error.
            self.pending.remove(&key);
        }
    }

    fn complete(&self, id: u64, results: Vec<Value>) {
        match self.pending.remove(&id) {
            Some((_, tx)) => {
                let _ = tx.send(results);
            }
            None => tracing::debug!(id, "response for a call nobody is waiting on"),
        }
    }

    fn handle_message(&self, msg: &[u8]) {
        match Frame::decode(msg) {
            Ok(Frame::Response(resp)) => self.complete(resp.correlation_id, resp.results),
            Ok(Frame::Request(req)) => {
                tracing::warn!(id = req.correlation_id, "client received a request frame; ignoring");
            }
            Err(e) => match decode_correlation_id(msg) {
                Ok(id) => {
                    tracing::warn!(id, error = %e, "malformed response");
                    self.complete(id, Vec::new());
                }
                Err(_) => tracing::warn!(error = %e, "dropping unreadable frame"),
            },
        }
    }
}

/// Shuts the connection down when a background task ends, including by cancellation.
struct ShutdownGuard(Arc<Shared>);

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

/// One connection to a server.
pub struct Client {
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    id_gen: AtomicU64,
    tasks: Vec<JoinHandle<()>>,
}

impl Client {
    /// Takes ownership of a transport and spawns the writer and pump tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        let transport: Arc<dyn Transport> = Arc::from(transport);
        let shared = Arc::new(Shared { pending: DashMap::new(), connected: AtomicBool::new(true) });
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        let writer_transport = transport.clone();
        let writer_guard = ShutdownGuard(shared.clone());
        let writer = tokio::spawn(async move {
            let _guard = writer_guard;
            while let Some(payload) = outbound_rx.recv().await {
                if let Err(e) = writer_transport.send(&payload).await {
                    tracing::warn!(error = %e, "send failed; closing connection");
                    break;
                }
            }
        });

        let pump_shared = shared.clone();
        let pump = tokio::spawn(async move {
            let _guard = ShutdownGuard(pump_shared.clone());
            loop {
                match transport.recv().await {
                    Ok(Some(msg)) => pump_shared.handle_message(&msg),
                    Ok(None) => {
                        tracing::info!("server closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "transport error in pump");
                        break;
                    }
                }
            }
        });

        Self { shared, outbound, id_gen: AtomicU64::new(1), tasks: vec![writer, pump] }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Number of calls currently waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.shared.pending.len()
    }

    /// Sends a request and parks the calling thread until its response arrives.
    ///
    /// Returns the raw result list, or an empty list if the connection is absent or dropped
    /// before the response arrived. An empty list means the outcome is unknown.
    pub fn call_synchronous(&self, class_name: &str, function_name: &str, args: &[Value]) -> Vec<Value> {
        if !self.is_connected() {
            return Vec::new();
        }

        let id = self.id_gen.fetch_add(1, Ordering::Relaxed);
        let payload = match Request::new(id, class_name, function_name, args.to_vec()).to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(id, error = %e, "request could not be encoded");
                return Vec::new();
            }
        };

        let (tx, rx) = oneshot::channel();
        self.shared.pending.insert(id, tx);

        // Shutdown may have drained the table between the first check and the insert.
        if !self.is_connected() {
            self.shared.pending.remove(&id);
            return Vec::new();
        }

        tracing::debug!(id, class = class_name, function = function_name, "call");
        if self.outbound.send(payload).is_err() {
            self.shared.pending.remove(&id);
            return Vec::new();
        }

        rx.blocking_recv().unwrap_or_default()
    }

    /// Calls a known endpoint and classifies the outcome.
    pub fn call(&self, endpoint: Endpoint, args: &[Value]) -> Result<Vec<Value>, CallError> {
        let (class_name, function_name) = endpoint.names();
        status::classify(self.call_synchronous(class_name, function_name, args))
    }

    /// Drops the connection. Outstanding calls return empty.
    pub fn close(&self) {
        for task in &self.tasks {
            task.abort();
        }
        self.shared.shutdown();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

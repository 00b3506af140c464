//! The connection slot.
//!
//! Client-side objects never hold a `Client` directly. They ask the `Controller` for the current
//! connection on every call, so reconnecting swaps the connection underneath them and a missing
//! connection surfaces as `CallError::Unavailable`.

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use wirepack::Value;
use wirerpc::CallError;

use crate::client::Client;
use crate::endpoint::Endpoint;
use crate::transport::Transport;

#[derive(Default)]
pub struct Controller {
    slot: RwLock<Option<Arc<Client>>>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a new connection, closing any previous one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self, transport: Box<dyn Transport>) -> Arc<Client> {
        let client = Arc::new(Client::new(transport));
        let previous = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(client.clone());
        if let Some(previous) = previous {
            previous.close();
        }
        tracing::info!("connected");
        client
    }

    /// Closes and forgets the current connection, if any.
    pub fn disconnect(&self) {
        let previous = self.slot.write().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(previous) = previous {
            previous.close();
            tracing::info!("disconnected");
        }
    }

    /// The current connection, if one is installed.
    pub fn connection(&self) -> Option<Arc<Client>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_some_and(|c| c.is_connected())
    }

    /// Raw call through the current connection; empty if there is none.
    pub fn call_synchronous(&self, class_name: &str, function_name: &str, args: &[Value]) -> Vec<Value> {
        match self.connection() {
            Some(client) => client.call_synchronous(class_name, function_name, args),
            None => Vec::new(),
        }
    }

    pub fn call(&self, endpoint: Endpoint, args: &[Value]) -> Result<Vec<Value>, CallError> {
        match self.connection() {
            Some(client) => client.call(endpoint, args),
            None => Err(CallError::Unavailable),
        }
    }
}

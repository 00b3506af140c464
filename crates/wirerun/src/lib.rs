//! # WireRun
//!
//! Both ends of the engine bridge on top of `wirerpc`.
//!
//! ## Client side
//! - `transport`, `channel`: moving whole messages over a socket or an in-memory pair.
//! - `client`: the blocking call façade with correlation ids and disconnect handling.
//! - `controller`: the replaceable connection slot client objects call through.
//! - `query`: the periodic query loop behind streaming objects.
//! - `api`: typed client objects (`Input`, `Source`, `VolMeter`).
//!
//! ## Server side
//! - `engine`: the engine model and its lifecycle signals.
//! - `handles`: the handle tables that track engine objects for remote callers.
//! - `context`, `config`: the explicitly owned state handed to every handler.
//! - `handlers`, `server`: endpoint implementations and the per-connection serve loop.
//!
//! `endpoint` is shared: it names every `(collection, function)` pair once.

pub mod api;
pub mod channel;
pub mod client;
pub mod config;
pub mod context;
pub mod controller;
pub mod endpoint;
pub mod engine;
pub mod handlers;
pub mod handles;
pub mod query;
pub mod server;
pub mod transport;

#[cfg(test)]
mod tests;

pub use client::Client;
pub use config::ServerConfig;
pub use context::ServerContext;
pub use controller::Controller;
pub use endpoint::Endpoint;
pub use handles::ObjectManager;
pub use server::Server;
pub use transport::Transport;
pub use transport::TransportConfig;

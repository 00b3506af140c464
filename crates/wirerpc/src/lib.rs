//! # WireRPC
//!
//! A name-addressed request/response protocol over Wirepack.
//!
//! ## Architecture
//!
//! - **Frames** (`frame`): the Message Envelope. A request names a collection and a function and
//!   carries a correlation id plus a flat list of `Value`s; a response echoes the id and carries
//!   results whose first element is a status code.
//! - **Status** (`status`): the error taxonomy shared by both processes, and the client-side
//!   classification of a raw result list into a payload or a `CallError`.
//! - **Registry** (`registry`): the startup-time table of `(collection, function)` endpoints,
//!   each with declared parameter types and a handler.
//! - **Dispatcher** (`dispatch`): resolves a request against the Registry, validates arguments,
//!   runs the handler behind a panic boundary, and always produces a response.

pub mod dispatch;
pub mod error;
pub mod frame;
pub mod registry;
pub mod status;


pub use dispatch::Dispatcher;
pub use error::Error;
pub use error::Result;
pub use frame::decode_correlation_id;
pub use frame::Frame;
pub use frame::Request;
pub use frame::Response;
pub use registry::Collection;
pub use registry::EndpointId;
pub use registry::Handler;
pub use registry::Registry;
pub use status::CallError;
pub use status::ErrorCode;

pub use wirepack::TypeTag;
pub use wirepack::Value;

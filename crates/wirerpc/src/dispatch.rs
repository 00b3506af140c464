//! # Dispatcher
//!
//! Turns a request into exactly one response.
//!
//! ## Invariants
//! - **Always Answers**: Unknown endpoints, bad arguments, handler panics, and handlers that forget
//!   their status all still produce a response, so a blocked caller is never left waiting.
//! - **Synchronous**: Handlers run to completion on the calling thread.

use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;

use wirepack::Value;

use crate::frame::decode_correlation_id;
use crate::frame::Frame;
use crate::frame::Request;
use crate::frame::Response;
use crate::registry::Function;
use crate::registry::Registry;
use crate::status;
use crate::status::ErrorCode;

/// Owns a frozen `Registry` and routes requests through it.
pub struct Dispatcher<C> {
    registry: Registry<C>,
}

impl<C> Dispatcher<C> {
    pub fn new(registry: Registry<C>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    /// Resolves, validates and runs a request.
    pub fn dispatch(&self, ctx: &C, request: &Request) -> Response {
        let results = match self.registry.resolve(&request.class_name, &request.function_name) {
            None => {
                tracing::debug!(
                    collection = %request.class_name,
                    function = %request.function_name,
                    "unknown endpoint"
                );
                status::unknown_endpoint()
            }
            Some(id) => match self.registry.get(id) {
                Some(function) => invoke(function, ctx, request),
                None => status::unknown_endpoint(),
            },
        };
        Response::new(request.correlation_id, results)
    }

    /// Decodes a raw request frame, dispatches it and encodes the response.
    ///
    /// Returns `None` only when there is nobody to answer: the frame is not a request, or it is
    /// too damaged to recover a correlation id from.
    pub fn dispatch_bytes(&self, ctx: &C, bytes: &[u8]) -> Option<Vec<u8>> {
        let response = match Frame::decode(bytes) {
            Ok(Frame::Request(request)) => self.dispatch(ctx, &request),
            Ok(Frame::Response(response)) => {
                tracing::warn!(id = response.correlation_id, "dispatcher received a response frame");
                return None;
            }
            Err(e) => match decode_correlation_id(bytes) {
                Ok(id) => {
                    tracing::warn!(id, error = %e, "malformed request");
                    Response::new(id, status::error(ErrorCode::CriticalError, format!("Malformed request: {}", e)))
                }
                Err(_) => {
                    tracing::warn!(error = %e, "dropping unreadable frame");
                    return None;
                }
            },
        };

        match response.to_bytes() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(id = response.correlation_id, error = %e, "response could not be encoded");
                let fallback = Response::new(
                    response.correlation_id,
                    status::error(ErrorCode::CriticalError, "Response could not be encoded."),
                );
                fallback.to_bytes().ok()
            }
        }
    }
}

fn invoke<C>(function: &Function<C>, ctx: &C, request: &Request) -> Vec<Value> {
    if let Err(e) = wirepack::validate_types(&request.args, &function.params) {
        tracing::debug!(
            collection = %function.collection,
            function = %function.name,
            error = %e,
            "rejected arguments"
        );
        return status::error(ErrorCode::BadParameter, e.to_string());
    }

    let handler = function.handler();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        handler(ctx, request.correlation_id, &request.args)
    }));

    match outcome {
        Ok(results) if status::has_status(&results) => results,
        Ok(_) => {
            tracing::warn!(collection = %function.collection, function = %function.name, "handler produced no status");
            status::error(
                ErrorCode::CriticalError,
                format!("{}.{} produced no status.", function.collection, function.name),
            )
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            tracing::warn!(collection = %function.collection, function = %function.name, %reason, "handler panicked");
            status::error(
                ErrorCode::CriticalError,
                format!("{}.{} failed: {}", function.collection, function.name, reason),
            )
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

//! # Client Object API
//!
//! Typed wrappers over the endpoints. Each object holds a handle and the shared `Controller`;
//! every method is one blocking call and returns `Result<_, CallError>`, so callers can tell
//! "your object is gone" (`InvalidReference`) from "bad data" (`BadParameter`) from
//! "feature unavailable" (`Unavailable`).
//!
//! These methods park the calling thread and must not be used from inside an async task.

mod source;
mod volmeter;

use std::sync::Arc;

use wirepack::Value;
use wirerpc::CallError;

use crate::controller::Controller;
use crate::endpoint::Endpoint;

pub use source::Source;
pub use volmeter::CallbackId;
pub use volmeter::VolMeter;
pub use volmeter::decode_levels;

/// Entry point for creating sources.
pub struct Input;

impl Input {
    /// Creates a source of input kind `id`.
    pub fn create(controller: &Arc<Controller>, id: &str, name: &str) -> Result<Source, CallError> {
        let payload = controller.call(Endpoint::InputCreate, &[Value::from(id), Value::from(name)])?;
        let handle = payload_u64(&payload, 0)?;
        Ok(Source::from_handle(controller.clone(), handle))
    }
}

// ============================================================================
//  PAYLOAD ACCESSORS
// ============================================================================

fn malformed(payload: &[Value], idx: usize, expected: &str) -> CallError {
    match payload.get(idx) {
        Some(v) => CallError::Malformed(format!("result {}: expected {}, found {}", idx, expected, v.type_tag())),
        None => CallError::Malformed(format!("result {}: expected {}, found nothing", idx, expected)),
    }
}

fn payload_u64(payload: &[Value], idx: usize) -> Result<u64, CallError> {
    payload.get(idx).and_then(Value::as_u64).ok_or_else(|| malformed(payload, idx, "u64"))
}

fn payload_u32(payload: &[Value], idx: usize) -> Result<u32, CallError> {
    payload.get(idx).and_then(Value::as_u32).ok_or_else(|| malformed(payload, idx, "u32"))
}

fn payload_bool(payload: &[Value], idx: usize) -> Result<bool, CallError> {
    payload
        .get(idx)
        .and_then(Value::as_i32)
        .map(|v| v != 0)
        .ok_or_else(|| malformed(payload, idx, "i32"))
}

fn payload_string(payload: &[Value], idx: usize) -> Result<String, CallError> {
    payload
        .get(idx)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| malformed(payload, idx, "string"))
}

fn payload_f32(payload: &[Value], idx: usize) -> Result<f32, CallError> {
    payload.get(idx).and_then(Value::as_f32).ok_or_else(|| malformed(payload, idx, "f32"))
}

//! # Status Taxonomy
//!
//! Every handled response starts with a `UInt64` status code. A response consisting of the
//! single element `Null` is reserved for "no such endpoint" and is produced only by the
//! dispatcher; the dispatcher rewrites any handler output that does not begin with a status,
//! so the sentinel cannot be confused with a handler that returned null.
//!
//! An empty result list never crosses the wire. The client produces it locally when the
//! transport failed, and it means the outcome of the call is unknown.

use wirepack::Value;

/// Application-level status carried in `results[0]`.
#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Ok = 0,
    /// Generic failure reported by a handler.
    Error = 1,
    NotFound = 2,
    OutOfIndex = 3,
    /// A handle argument does not resolve to a live object.
    InvalidReference = 4,
    /// Internal failure: handler panic, malformed frame, missing status.
    CriticalError = 5,
    /// Argument count or types do not match the registered signature.
    BadParameter = 6,
}

impl ErrorCode {
    pub fn from_u64(code: u64) -> Option<Self> {
        match code {
            0 => Some(ErrorCode::Ok),
            1 => Some(ErrorCode::Error),
            2 => Some(ErrorCode::NotFound),
            3 => Some(ErrorCode::OutOfIndex),
            4 => Some(ErrorCode::InvalidReference),
            5 => Some(ErrorCode::CriticalError),
            6 => Some(ErrorCode::BadParameter),
            _ => None,
        }
    }

    pub fn as_u64(self) -> u64 {
        self as u64
    }

    pub fn to_value(self) -> Value {
        Value::UInt64(self.as_u64())
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Builds a successful result list: `[Ok, payload...]`.
pub fn ok(payload: Vec<Value>) -> Vec<Value> {
    let mut results = Vec::with_capacity(payload.len() + 1);
    results.push(ErrorCode::Ok.to_value());
    results.extend(payload);
    results
}

/// Builds a failed result list: `[code, message]`.
pub fn error(code: ErrorCode, message: impl Into<String>) -> Vec<Value> {
    vec![code.to_value(), Value::String(message.into())]
}

/// The unknown-endpoint sentinel.
pub fn unknown_endpoint() -> Vec<Value> {
    vec![Value::Null]
}

pub fn is_unknown_endpoint(results: &[Value]) -> bool {
    matches!(results, [Value::Null])
}

/// Whether `results` begins with a status code, as every handler output must.
pub fn has_status(results: &[Value]) -> bool {
    matches!(results.first(), Some(Value::UInt64(_)))
}

/// Why a call did not produce a usable payload, as seen by the calling side.
#[derive(Debug, Clone, PartialEq)]
pub enum CallError {
    /// The connection is absent or dropped; the operation may or may not have happened.
    Unavailable,
    /// The server has no such `(collection, function)`.
    UnknownEndpoint,
    /// The object a handle referred to is gone (or never existed).
    InvalidReference(String),
    /// The arguments did not match what the endpoint expects.
    BadParameter(String),
    /// Any other non-zero status.
    Remote { code: u64, message: String },
    /// The response itself was not shaped like a response.
    Malformed(String),
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "Failed to make IPC call, verify IPC status"),
            Self::UnknownEndpoint => write!(f, "Endpoint does not exist on the server"),
            Self::InvalidReference(msg) => write!(f, "Invalid reference: {}", msg),
            Self::BadParameter(msg) => write!(f, "Bad parameter: {}", msg),
            Self::Remote { code, message } => match ErrorCode::from_u64(*code) {
                Some(known) => write!(f, "{}: {}", known, message),
                None => write!(f, "Status {}: {}", code, message),
            },
            Self::Malformed(msg) => write!(f, "Malformed response: {}", msg),
        }
    }
}

impl std::error::Error for CallError {}

/// Splits a raw result list into its payload (everything after an `Ok` status) or a `CallError`.
pub fn classify(mut results: Vec<Value>) -> Result<Vec<Value>, CallError> {
    if results.is_empty() {
        return Err(CallError::Unavailable);
    }
    if is_unknown_endpoint(&results) {
        return Err(CallError::UnknownEndpoint);
    }
    let Some(code) = results[0].as_u64() else {
        return Err(CallError::Malformed(format!(
            "expected u64 status, found {}",
            results[0].type_tag()
        )));
    };
    if code == ErrorCode::Ok.as_u64() {
        results.remove(0);
        return Ok(results);
    }

    let message = results
        .get(1)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Err(match ErrorCode::from_u64(code) {
        Some(ErrorCode::InvalidReference) => CallError::InvalidReference(message),
        Some(ErrorCode::BadParameter) => CallError::BadParameter(message),
        _ => CallError::Remote { code, message },
    })
}

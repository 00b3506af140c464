//! # Error Definitions
//!
//! Failures of the envelope layer. These describe a frame that could not be built or read;
//! application-level failures travel inside a response as a status code instead.

use wirepack::Error as PackError;

/// Operational failures within the RPC mechanism itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The underlying Wirepack serialization failed (truncation, unknown tag, bad UTF-8).
    Serialization(PackError),
    /// The leading frame marker is neither a request nor a response.
    UnknownFrame(u8),
    /// The frame decoded but its structure is wrong (e.g. trailing bytes).
    ProtocolViolation(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::UnknownFrame(b) => write!(f, "Unknown frame marker: {:#04x}", b),
            Self::ProtocolViolation(msg) => write!(f, "Protocol violation: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<PackError> for Error {
    fn from(e: PackError) -> Self { Self::Serialization(e) }
}

/// A specialized Result type for RPC operations.
pub type Result<T> = std::result::Result<T, Error>;

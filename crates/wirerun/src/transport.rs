//! # Transport Abstraction
//!
//! A minimal, async interface for moving whole messages between processes.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The Transport knows nothing about frames, values or handles.
//!   It moves opaque buffers.
//! - **Message-Oriented**: `recv` yields exactly one message that a peer passed to `send`,
//!   in order, or `None` once the peer has closed the connection cleanly.
//!
//! ## Framing
//!
//! `StreamTransport` puts each message on a byte stream as `[u32 LE length][payload]`.

use std::fmt;
use std::io::ErrorKind;

use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::Mutex;

/// Errors that occur at the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The peer is unreachable or the connection was dropped mid-message.
    ConnectionLost(String),
    /// A message exceeds the configured frame limit.
    PayloadTooLarge { len: usize, max: u32 },
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::PayloadTooLarge { len, max } => {
                write!(f, "Payload of {} bytes exceeds the {} byte frame limit", len, max)
            }
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted => Self::ConnectionLost(e.to_string()),
            _ => Self::Io(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A bidirectional message channel.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one whole message.
    async fn send(&self, payload: &[u8]) -> Result<()>;

    /// Receives the next whole message, or `None` when the peer closed the connection.
    async fn recv(&self) -> Result<Option<Vec<u8>>>;
}

/// Limits applied by stream transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub max_frame_len: u32,
}

impl TransportConfig {
    pub const DEFAULT_MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

    pub fn with_max_frame_len(mut self, max_frame_len: u32) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { max_frame_len: Self::DEFAULT_MAX_FRAME_LEN }
    }
}

type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Length-prefixed framing over a byte stream.
///
/// Reads and writes are guarded separately, so one task can block in `recv`
/// while others `send`.
pub struct StreamTransport {
    reader: Mutex<Reader>,
    writer: Mutex<Writer>,
    config: TransportConfig,
}

impl StreamTransport {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Mutex::new(Box::new(reader)),
            writer: Mutex::new(Box::new(writer)),
            config: TransportConfig::default(),
        }
    }

    /// Splits a connected Unix socket into a transport.
    pub fn unix(stream: UnixStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }

    pub fn with_config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn check_len(&self, len: usize) -> Result<u32> {
        match u32::try_from(len) {
            Ok(n) if n <= self.config.max_frame_len => Ok(n),
            _ => Err(Error::PayloadTooLarge { len, max: self.config.max_frame_len }),
        }
    }
}

#[async_trait::async_trait]
impl Transport for StreamTransport {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        let len = self.check_len(payload.len())?;
        let mut writer = self.writer.lock().await;
        writer.write_u32_le(len).await?;
        writer.write_all(payload).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>> {
        let mut reader = self.reader.lock().await;

        // EOF before the first prefix byte is an orderly close; anywhere later it is a cut frame.
        let mut prefix = [0u8; 4];
        let mut filled = 0;
        while filled < prefix.len() {
            let n = reader.read(&mut prefix[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(Error::ConnectionLost(format!(
                    "stream ended after {} of {} length bytes",
                    filled,
                    prefix.len()
                )));
            }
            filled += n;
        }
        let len = self.check_len(u32::from_le_bytes(prefix) as usize)?;

        let mut payload = vec![0u8; len as usize];
        reader.read_exact(&mut payload).await?;
        Ok(Some(payload))
    }
}

//! # Protocol Frames
//!
//! Defines the structure of the Message Envelope (Request vs Response).
//!
//! ## Layout
//! - **Request**:  `['Q'][UInt64 id][String collection][String function][Values args]`
//! - **Response**: `['R'][UInt64 id][Values results]`
//!
//! ## Invariants
//! - **Panic Safety**: All decoding paths return `Result`, never panicking on unknown data.
//! - **Exactness**: A frame must consume its whole buffer; trailing bytes are a violation.

use wirepack::Decoder;
use wirepack::Encoder;
use wirepack::Value;

use crate::error::Error;
use crate::error::Result;

const REQUEST_MARKER: u8 = b'Q';
const RESPONSE_MARKER: u8 = b'R';

/// An inbound or outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub correlation_id: u64,
    pub class_name: String,
    pub function_name: String,
    pub args: Vec<Value>,
}

impl Request {
    pub fn new(
        correlation_id: u64,
        class_name: impl Into<String>,
        function_name: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            correlation_id,
            class_name: class_name.into(),
            function_name: function_name.into(),
            args,
        }
    }

    /// Encode this request into the encoder.
    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.marker(REQUEST_MARKER);
        enc.u64(self.correlation_id);
        enc.str(&self.class_name)?;
        enc.str(&self.function_name)?;
        enc.values(&self.args)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = Encoder::new();
        self.encode(&mut enc)?;
        Ok(enc.into_bytes())
    }

    fn decode_body(dec: &mut Decoder<'_>) -> Result<Self> {
        let correlation_id = dec.u64()?;
        let class_name = dec.str()?.to_string();
        let function_name = dec.str()?.to_string();
        let args = dec.values()?;
        Ok(Self { correlation_id, class_name, function_name, args })
    }
}

/// The reply to exactly one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub correlation_id: u64,
    /// `results[0]` is the status; see `status::classify`.
    pub results: Vec<Value>,
}

impl Response {
    pub fn new(correlation_id: u64, results: Vec<Value>) -> Self {
        Self { correlation_id, results }
    }

    /// Encode this response into the encoder.
    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.marker(RESPONSE_MARKER);
        enc.u64(self.correlation_id);
        enc.values(&self.results)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = Encoder::new();
        self.encode(&mut enc)?;
        Ok(enc.into_bytes())
    }

    fn decode_body(dec: &mut Decoder<'_>) -> Result<Self> {
        let correlation_id = dec.u64()?;
        let results = dec.values()?;
        Ok(Self { correlation_id, results })
    }
}

/// Top-level frame decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Request(Request),
    Response(Response),
}

impl Frame {
    /// Decode a whole frame from `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut dec = Decoder::new(bytes);
        let frame = match dec.marker()? {
            REQUEST_MARKER => Frame::Request(Request::decode_body(&mut dec)?),
            RESPONSE_MARKER => Frame::Response(Response::decode_body(&mut dec)?),
            other => return Err(Error::UnknownFrame(other)),
        };
        if dec.remaining() != 0 {
            return Err(Error::ProtocolViolation(format!(
                "{} trailing bytes after frame",
                dec.remaining()
            )));
        }
        Ok(frame)
    }

    pub fn correlation_id(&self) -> u64 {
        match self {
            Frame::Request(req) => req.correlation_id,
            Frame::Response(resp) => resp.correlation_id,
        }
    }
}

/// Decodes just the correlation id from a raw frame.
/// This is useful for answering or routing a frame whose body fails to decode.
pub fn decode_correlation_id(bytes: &[u8]) -> Result<u64> {
    let mut dec = Decoder::new(bytes);
    match dec.marker()? {
        REQUEST_MARKER | RESPONSE_MARKER => Ok(dec.u64()?),
        other => Err(Error::UnknownFrame(other)),
    }
}

//! # Wirepack
//!
//! A small, self-describing value encoding for values that cross the process boundary.
//!
//! ## Philosophy
//!
//! - **Self-Describing**: Every value leads with its own type tag. Decoding never needs a schema;
//!   callers that know what they expect validate it separately (see [`validate_types`]).
//! - **Closed Set**: Nine variants, no nesting. Argument lists are flat sequences.
//! - **Bounded**: Decoders are zero-copy, bounds-checked views. A truncated buffer is an error,
//!   never an out-of-bounds read.
//!
//! ## Format
//!
//! - **Null**: `[Tag: 1b]`
//! - **Scalars**: `[Tag: 1b][Data: N]`
//! - **Blobs**: `[Tag: 1b][Len: 4b][Data: Len]`
//! - **Value lists**: `[Count: 4b][Value]*`
//!
//! All integers and floats are Little-Endian.

#[cfg(test)]
mod tests;

/// Wirepack serialization and deserialization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer exhausted while reading.
    TruncatedMessage { needed: usize, available: usize },
    /// Byte does not correspond to a valid `TypeTag`.
    UnknownType(u8),
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// Blob length or list count exceeds `u32::MAX`.
    BlobTooLarge(usize),
    /// A value carried a different tag than the caller expected.
    TypeMismatch { expected: TypeTag, found: TypeTag },
    /// A value list had a different length than the caller expected.
    CountMismatch { expected: usize, found: usize },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::TruncatedMessage { needed, available } => {
                write!(f, "Truncated message: needed {} bytes, {} available", needed, available)
            }
            Error::UnknownType(b) => write!(f, "Unknown type tag: {:#04x}", b),
            Error::InvalidUtf8 => write!(f, "String is not valid UTF-8"),
            Error::BlobTooLarge(len) => write!(f, "Blob of {} bytes exceeds u32 length", len),
            Error::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            Error::CountMismatch { expected, found } => {
                write!(f, "Count mismatch: expected {} values, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for Wirepack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Identifies the type of an encoded value. Always the first byte of the encoding.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null = 0x00,

    // Fixed-width scalars
    UInt32 = 0x05,
    UInt64 = 0x06,
    Int32 = 0x09,
    Int64 = 0x0A,
    Float32 = 0x0B,
    Float64 = 0x0C,

    // Blobs (Tag + u32 Len + Bytes)
    String = 0x10,
    Binary = 0x11,
}

impl TypeTag {
    /// Returns the TypeTag for a given byte, or `None` if invalid.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(TypeTag::Null),
            0x05 => Some(TypeTag::UInt32),
            0x06 => Some(TypeTag::UInt64),
            0x09 => Some(TypeTag::Int32),
            0x0A => Some(TypeTag::Int64),
            0x0B => Some(TypeTag::Float32),
            0x0C => Some(TypeTag::Float64),
            0x10 => Some(TypeTag::String),
            0x11 => Some(TypeTag::Binary),
            _ => None,
        }
    }

    /// Size of the fixed payload following the tag, or `None` for length-prefixed blobs.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            TypeTag::Null => Some(0),
            TypeTag::UInt32 | TypeTag::Int32 | TypeTag::Float32 => Some(4),
            TypeTag::UInt64 | TypeTag::Int64 | TypeTag::Float64 => Some(8),
            TypeTag::String | TypeTag::Binary => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::UInt32 => "u32",
            TypeTag::UInt64 => "u64",
            TypeTag::Int32 => "i32",
            TypeTag::Int64 => "i64",
            TypeTag::Float32 => "f32",
            TypeTag::Float64 => "f64",
            TypeTag::String => "string",
            TypeTag::Binary => "binary",
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
//  VALUE
// ============================================================================

/// A single argument or result crossing the process boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Binary(Vec<u8>),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Int32(_) => TypeTag::Int32,
            Value::UInt32(_) => TypeTag::UInt32,
            Value::Int64(_) => TypeTag::Int64,
            Value::UInt64(_) => TypeTag::UInt64,
            Value::Float32(_) => TypeTag::Float32,
            Value::Float64(_) => TypeTag::Float64,
            Value::String(_) => TypeTag::String,
            Value::Binary(_) => TypeTag::Binary,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self { Value::Int32(v) => Some(*v), _ => None }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self { Value::UInt32(v) => Some(*v), _ => None }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self { Value::Int64(v) => Some(*v), _ => None }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self { Value::UInt64(v) => Some(*v), _ => None }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self { Value::Float32(v) => Some(*v), _ => None }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self { Value::Float64(v) => Some(*v), _ => None }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self { Value::String(v) => Some(v), _ => None }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self { Value::Binary(v) => Some(v), _ => None }
    }
}

impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int32(v) } }
impl From<u32> for Value { fn from(v: u32) -> Self { Value::UInt32(v) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int64(v) } }
impl From<u64> for Value { fn from(v: u64) -> Self { Value::UInt64(v) } }
impl From<f32> for Value { fn from(v: f32) -> Self { Value::Float32(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float64(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_string()) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<Vec<u8>> for Value { fn from(v: Vec<u8>) -> Self { Value::Binary(v) } }

// ============================================================================
//  ENCODER
// ============================================================================

/// An append-only encoder over a growable buffer.
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Creates a new encoder with default capacity.
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(256) }
    }

    /// Consumes the encoder and returns the final byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a view of the current buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn write_tag(&mut self, tag: TypeTag) {
        self.buf.push(tag as u8);
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        if len > u32::MAX as usize { return Err(Error::BlobTooLarge(len)); }
        self.buf.extend_from_slice(&(len as u32).to_le_bytes());
        Ok(())
    }

    /// Writes an untagged byte. Used by envelope headers, never inside a value.
    pub fn marker(&mut self, b: u8) {
        self.buf.push(b);
    }

    /// Encodes `Null` (the tag alone).
    pub fn null(&mut self) { self.write_tag(TypeTag::Null); }

    /// Encodes a signed 32-bit integer (LE).
    pub fn s32(&mut self, v: i32) { self.write_tag(TypeTag::Int32); self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Encodes an unsigned 32-bit integer (LE).
    pub fn u32(&mut self, v: u32) { self.write_tag(TypeTag::UInt32); self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Encodes a signed 64-bit integer (LE).
    pub fn s64(&mut self, v: i64) { self.write_tag(TypeTag::Int64); self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Encodes an unsigned 64-bit integer (LE).
    pub fn u64(&mut self, v: u64) { self.write_tag(TypeTag::UInt64); self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Encodes a 32-bit float (LE).
    pub fn f32(&mut self, v: f32) { self.write_tag(TypeTag::Float32); self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Encodes a 64-bit float (LE).
    pub fn f64(&mut self, v: f64) { self.write_tag(TypeTag::Float64); self.buf.extend_from_slice(&v.to_le_bytes()); }

    /// Encodes a UTF-8 string blob.
    pub fn str(&mut self, v: &str) -> Result<()> {
        if v.len() > u32::MAX as usize { return Err(Error::BlobTooLarge(v.len())); }
        self.write_tag(TypeTag::String);
        self.write_len(v.len())?;
        self.buf.extend_from_slice(v.as_bytes());
        Ok(())
    }

    /// Encodes a raw byte blob.
    pub fn bytes(&mut self, v: &[u8]) -> Result<()> {
        if v.len() > u32::MAX as usize { return Err(Error::BlobTooLarge(v.len())); }
        self.write_tag(TypeTag::Binary);
        self.write_len(v.len())?;
        self.buf.extend_from_slice(v);
        Ok(())
    }

    /// Encodes any `Value`.
    pub fn value(&mut self, val: &Value) -> Result<()> {
        match val {
            Value::Null => self.null(),
            Value::Int32(v) => self.s32(*v),
            Value::UInt32(v) => self.u32(*v),
            Value::Int64(v) => self.s64(*v),
            Value::UInt64(v) => self.u64(*v),
            Value::Float32(v) => self.f32(*v),
            Value::Float64(v) => self.f64(*v),
            Value::String(v) => self.str(v)?,
            Value::Binary(v) => self.bytes(v)?,
        }
        Ok(())
    }

    /// Encodes a counted sequence of values.
    pub fn values(&mut self, vals: &[Value]) -> Result<()> {
        self.write_len(vals.len())?;
        for val in vals {
            self.value(val)?;
        }
        Ok(())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
//  DECODER
// ============================================================================

/// A zero-copy, bounds-checked cursor over a byte slice.
///
/// Reading advances the internal cursor. Every read checks the remaining length first.
///
/// # Errors
/// All read operations return `Error::TruncatedMessage` if the buffer is exhausted.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over the slice.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the remaining bytes in the view.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns how many bytes have been consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if n > available {
            return Err(Error::TruncatedMessage { needed: n, available });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn read_len(&mut self) -> Result<usize> {
        Ok(u32::from_le_bytes(self.read_array()?) as usize)
    }

    /// Peeks the next TypeTag without advancing.
    pub fn peek_tag(&self) -> Result<TypeTag> {
        let Some(&b) = self.buf.get(self.pos) else {
            return Err(Error::TruncatedMessage { needed: 1, available: 0 });
        };
        TypeTag::from_u8(b).ok_or(Error::UnknownType(b))
    }

    fn check_tag(&mut self, expected: TypeTag) -> Result<()> {
        let found = self.peek_tag()?;
        if found != expected {
            return Err(Error::TypeMismatch { expected, found });
        }
        self.pos += 1;
        Ok(())
    }

    /// Reads an untagged byte written by `Encoder::marker`.
    pub fn marker(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Decodes `Null`.
    pub fn null(&mut self) -> Result<()> { self.check_tag(TypeTag::Null) }

    /// Decodes i32 (LE).
    pub fn s32(&mut self) -> Result<i32> { self.check_tag(TypeTag::Int32)?; Ok(i32::from_le_bytes(self.read_array()?)) }
    /// Decodes u32 (LE).
    pub fn u32(&mut self) -> Result<u32> { self.check_tag(TypeTag::UInt32)?; Ok(u32::from_le_bytes(self.read_array()?)) }
    /// Decodes i64 (LE).
    pub fn s64(&mut self) -> Result<i64> { self.check_tag(TypeTag::Int64)?; Ok(i64::from_le_bytes(self.read_array()?)) }
    /// Decodes u64 (LE).
    pub fn u64(&mut self) -> Result<u64> { self.check_tag(TypeTag::UInt64)?; Ok(u64::from_le_bytes(self.read_array()?)) }
    /// Decodes f32 (LE).
    pub fn f32(&mut self) -> Result<f32> { self.check_tag(TypeTag::Float32)?; Ok(f32::from_le_bytes(self.read_array()?)) }
    /// Decodes f64 (LE).
    pub fn f64(&mut self) -> Result<f64> { self.check_tag(TypeTag::Float64)?; Ok(f64::from_le_bytes(self.read_array()?)) }

    /// Decodes a string slice (UTF-8).
    pub fn str(&mut self) -> Result<&'a str> {
        self.check_tag(TypeTag::String)?;
        let len = self.read_len()?;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
    }

    /// Decodes a byte slice.
    pub fn bytes(&mut self) -> Result<&'a [u8]> {
        self.check_tag(TypeTag::Binary)?;
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    /// Decodes whatever value comes next, dispatching on its tag.
    pub fn value(&mut self) -> Result<Value> {
        let val = match self.peek_tag()? {
            TypeTag::Null => { self.null()?; Value::Null }
            TypeTag::Int32 => Value::Int32(self.s32()?),
            TypeTag::UInt32 => Value::UInt32(self.u32()?),
            TypeTag::Int64 => Value::Int64(self.s64()?),
            TypeTag::UInt64 => Value::UInt64(self.u64()?),
            TypeTag::Float32 => Value::Float32(self.f32()?),
            TypeTag::Float64 => Value::Float64(self.f64()?),
            TypeTag::String => Value::String(self.str()?.to_string()),
            TypeTag::Binary => Value::Binary(self.bytes()?.to_vec()),
        };
        Ok(val)
    }

    /// Decodes a counted sequence of values.
    pub fn values(&mut self) -> Result<Vec<Value>> {
        let count = self.read_len()?;
        // Every value is at least one byte; reject counts the buffer cannot hold
        // before allocating for them.
        let available = self.remaining();
        if count > available {
            return Err(Error::TruncatedMessage { needed: count, available });
        }
        let mut vals = Vec::with_capacity(count);
        for _ in 0..count {
            vals.push(self.value()?);
        }
        Ok(vals)
    }

    /// Skips the next value.
    pub fn skip(&mut self) -> Result<()> {
        let tag = self.peek_tag()?;
        self.pos += 1;
        match tag.fixed_width() {
            Some(n) => { self.read_bytes(n)?; }
            None => {
                let len = self.read_len()?;
                self.read_bytes(len)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
//  CONVENIENCE
// ============================================================================

/// Encodes a single value into a fresh buffer.
pub fn encode(val: &Value) -> Result<Vec<u8>> {
    let mut enc = Encoder::new();
    enc.value(val)?;
    Ok(enc.into_bytes())
}

/// Decodes one value from the front of `bytes`, returning it with the number of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(Value, usize)> {
    let mut dec = Decoder::new(bytes);
    let val = dec.value()?;
    Ok((val, dec.position()))
}

/// Checks that `vals` matches `expected` in length and, position by position, in type.
pub fn validate_types(vals: &[Value], expected: &[TypeTag]) -> Result<()> {
    if vals.len() != expected.len() {
        return Err(Error::CountMismatch { expected: expected.len(), found: vals.len() });
    }
    for (val, &tag) in vals.iter().zip(expected) {
        let found = val.type_tag();
        if found != tag {
            return Err(Error::TypeMismatch { expected: tag, found });
        }
    }
    Ok(())
}

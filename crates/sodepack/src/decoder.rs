use std::io::Read;

use crate::types::Error;
use crate::types::Limits;
use crate::types::Result;
use crate::types::Tag;
use crate::value::Content;
use crate::value::Value;

/// Upper bound on capacity reserved up front from a count read off the wire.
const MAX_PREALLOC: usize = 64;

/// Reads SODEP primitives and value trees from an `io::Read`.
///
/// Every length and count read from the stream is validated against the
/// decoder's `Limits` before it drives allocation or recursion.
///
/// # Errors
/// Read operations return `Error::UnexpectedEnd` if the stream ends early and
/// `Error::Io` for any other reader failure. After any error the stream
/// position is unspecified and the stream should be abandoned.
pub struct Decoder<R> {
    reader: R,
    limits: Limits,
    nodes: usize,
}

impl Decoder<&[u8]> {
    /// Bytes not yet consumed from the slice.
    pub fn remaining(&self) -> usize {
        self.reader.len()
    }
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limits(reader, Limits::default())
    }

    pub fn with_limits(reader: R, limits: Limits) -> Self {
        Self { reader, limits, nodes: 0 }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Decodes a raw byte.
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Decodes i32 (BE).
    pub fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Decodes i64 (BE).
    pub fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Decodes f64 (BE).
    pub fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Decodes a length or count prefix, rejecting negative values.
    pub fn length(&mut self) -> Result<usize> {
        let n = self.i32()?;
        usize::try_from(n).map_err(|_| Error::InvalidLength(n))
    }

    /// Decodes a length-prefixed UTF-8 string.
    pub fn str(&mut self) -> Result<String> {
        let len = self.length()?;
        if len > self.limits.max_string_len {
            return Err(Error::LengthLimitExceeded { len, limit: self.limits.max_string_len });
        }

        // Grow with the data actually delivered rather than trusting `len`.
        let mut buf = Vec::with_capacity(len.min(8 * 1024));
        (&mut self.reader).take(len as u64).read_to_end(&mut buf)?;
        if buf.len() < len {
            return Err(Error::UnexpectedEnd);
        }
        String::from_utf8(buf).map_err(|_| Error::InvalidUtf8)
    }

    /// Decodes scalar content. An unknown tag fails before any payload is read.
    pub fn content(&mut self) -> Result<Content> {
        let b = self.u8()?;
        match Tag::from_u8(b).ok_or(Error::InvalidTag(b))? {
            Tag::Absent => Ok(Content::Absent),
            Tag::Text => Ok(Content::Text(self.str()?)),
            Tag::Int32 => Ok(Content::Int32(self.i32()?)),
            Tag::Float64 => Ok(Content::Float64(self.f64()?)),
        }
    }

    /// Decodes a complete value tree.
    ///
    /// `Limits::max_nodes` applies to each call separately.
    ///
    /// # Errors
    /// Returns `Error::RecursionLimitExceeded` or `Error::NodeLimitExceeded`
    /// when the wire data exceeds the decoder's limits. No partially built
    /// tree is ever returned.
    pub fn value(&mut self) -> Result<Value> {
        self.nodes = 0;
        self.value_impl(0)
    }

    fn value_impl(&mut self, depth: usize) -> Result<Value> {
        if depth > self.limits.max_depth {
            return Err(Error::RecursionLimitExceeded { limit: self.limits.max_depth });
        }
        self.nodes += 1;
        if self.nodes > self.limits.max_nodes {
            return Err(Error::NodeLimitExceeded { limit: self.limits.max_nodes });
        }

        let mut value = Value::new(self.content()?);
        let names = self.length()?;
        for _ in 0..names {
            let name = self.str()?;
            let count = self.length()?;
            let mut seq = Vec::with_capacity(count.min(MAX_PREALLOC));
            for _ in 0..count {
                seq.push(self.value_impl(depth + 1)?);
            }
            // A repeated name at the same level replaces the earlier group.
            value.set_children(name, seq);
        }
        Ok(value)
    }
}

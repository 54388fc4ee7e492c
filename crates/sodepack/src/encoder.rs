use std::io::Write;

use crate::types::Error;
use crate::types::Limits;
use crate::types::Result;
use crate::value::Content;
use crate::value::Value;

/// Writes SODEP primitives and value trees to an `io::Write`.
///
/// The encoder holds no state between calls besides the writer, so a single
/// encoder may write any number of values back-to-back.
///
/// # Partial Writes
///
/// An error can leave a prefix of the item in the writer. Encode into a
/// `Vec<u8>` first when the destination must only ever see whole messages.
pub struct Encoder<W> {
    writer: W,
    limits: Limits,
}

impl Encoder<Vec<u8>> {
    /// Creates an encoder over a fresh in-memory buffer.
    pub fn buffer() -> Self {
        Self::new(Vec::with_capacity(256))
    }

    /// Consumes the encoder and returns the bytes written so far.
    pub fn into_bytes(self) -> Vec<u8> {
        self.writer
    }
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self::with_limits(writer, Limits::default())
    }

    pub fn with_limits(writer: W, limits: Limits) -> Self {
        Self { writer, limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Encodes a raw byte.
    pub fn u8(&mut self, v: u8) -> Result<()> {
        self.writer.write_all(&[v])?;
        Ok(())
    }

    /// Encodes a signed 32-bit integer (BE).
    pub fn i32(&mut self, v: i32) -> Result<()> {
        self.writer.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    /// Encodes a signed 64-bit integer (BE).
    pub fn i64(&mut self, v: i64) -> Result<()> {
        self.writer.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    /// Encodes a 64-bit float (BE).
    pub fn f64(&mut self, v: f64) -> Result<()> {
        self.writer.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    /// Encodes a length or count as a non-negative `i32`.
    pub fn length(&mut self, len: usize) -> Result<()> {
        let prefix = i32::try_from(len).map_err(|_| Error::BlobTooLarge(len))?;
        self.i32(prefix)
    }

    /// Encodes a length-prefixed UTF-8 string.
    pub fn str(&mut self, v: &str) -> Result<()> {
        self.length(v.len())?;
        self.writer.write_all(v.as_bytes())?;
        Ok(())
    }

    /// Encodes scalar content as its tag byte followed by the payload.
    pub fn content(&mut self, content: &Content) -> Result<()> {
        self.u8(content.tag() as u8)?;
        match content {
            Content::Absent => Ok(()),
            Content::Text(s) => self.str(s),
            Content::Int32(v) => self.i32(*v),
            Content::Float64(v) => self.f64(*v),
        }
    }

    /// Encodes a value tree, depth-first and pre-order.
    ///
    /// # Errors
    /// Returns `Error::RecursionLimitExceeded` if the tree is deeper than
    /// `Limits::max_depth`.
    pub fn value(&mut self, value: &Value) -> Result<()> {
        self.value_impl(value, 0)
    }

    fn value_impl(&mut self, value: &Value, depth: usize) -> Result<()> {
        if depth > self.limits.max_depth {
            return Err(Error::RecursionLimitExceeded { limit: self.limits.max_depth });
        }

        self.content(value.content())?;
        self.length(value.children_count())?;
        for (name, seq) in value.children() {
            self.str(name)?;
            self.length(seq.len())?;
            for child in seq {
                self.value_impl(child, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl Default for Encoder<Vec<u8>> {
    fn default() -> Self {
        Self::buffer()
    }
}

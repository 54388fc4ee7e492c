//! # Protocol Frames
//!
//! Encoding and decoding of the message envelope.
//!
//! ## Invariants
//! - **Fixed Order**: id, resource path, operation name, fault, payload.
//! - **Exact Consumption**: A decode reads exactly one message and nothing past it.
//! - **All or Nothing**: A failed decode never yields a partially populated `Message`.

use std::io::Read;
use std::io::Write;

use sodepack::Decoder;
use sodepack::Encoder;
use sodepack::Limits;

use crate::error::Error;
use crate::error::Result;
use crate::message::Fault;
use crate::message::Message;

pub(crate) const FAULT_ABSENT: u8 = 0x00;
pub(crate) const FAULT_PRESENT: u8 = 0x01;

/// Encodes an optional fault: a presence byte, then name and detail.
pub fn encode_fault<W: Write>(enc: &mut Encoder<W>, fault: Option<&Fault>) -> Result<()> {
    match fault {
        None => enc.u8(FAULT_ABSENT)?,
        Some(fault) => {
            enc.u8(FAULT_PRESENT)?;
            enc.str(fault.name())?;
            enc.value(fault.detail())?;
        }
    }
    Ok(())
}

/// Decodes an optional fault.
///
/// # Errors
/// Returns `Error::InvalidFaultFlag` for a presence byte other than 0 or 1.
pub fn decode_fault<R: Read>(dec: &mut Decoder<R>) -> Result<Option<Fault>> {
    match dec.u8()? {
        FAULT_ABSENT => Ok(None),
        FAULT_PRESENT => {
            let name = dec.str()?;
            let detail = dec.value()?;
            Ok(Some(Fault::with_detail(name, detail)))
        }
        b => Err(Error::InvalidFaultFlag(b)),
    }
}

/// Encodes a full message onto the wire.
pub fn encode_message<W: Write>(enc: &mut Encoder<W>, msg: &Message) -> Result<()> {
    enc.i64(msg.id())?;
    enc.str(msg.resource_path())?;
    enc.str(msg.operation_name())?;
    encode_fault(enc, msg.fault())?;
    enc.value(msg.payload())?;
    Ok(())
}

/// Decodes one full message, blocking on the reader as needed.
pub fn decode_message<R: Read>(dec: &mut Decoder<R>) -> Result<Message> {
    let id = dec.i64()?;
    let resource_path = dec.str()?;
    let operation_name = dec.str()?;
    let fault = decode_fault(dec)?;
    let payload = dec.value()?;

    let msg = Message::new(id, resource_path, operation_name, payload);
    Ok(match fault {
        Some(fault) => msg.with_fault(fault),
        None => msg,
    })
}

/// Attempts to decode one message from the front of `buf`.
///
/// Returns `Ok(None)` when `buf` holds only a prefix of a message, so the
/// caller can read more bytes and retry. On success, also returns the number
/// of bytes the message occupied.
pub fn try_decode_message(buf: &[u8], limits: &Limits) -> Result<Option<(Message, usize)>> {
    let mut dec = Decoder::with_limits(buf, *limits);
    match decode_message(&mut dec) {
        Ok(msg) => Ok(Some((msg, buf.len() - dec.remaining()))),
        Err(Error::Serialization(sodepack::Error::UnexpectedEnd)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl Message {
    /// Encodes this message into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = Encoder::buffer();
        encode_message(&mut enc, self)?;
        Ok(enc.into_bytes())
    }

    /// Decodes a buffer holding exactly one message.
    ///
    /// # Errors
    /// Returns `Error::TrailingBytes` if `bytes` continues past the message.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut dec = Decoder::new(bytes);
        let msg = decode_message(&mut dec)?;
        match dec.remaining() {
            0 => Ok(msg),
            n => Err(Error::TrailingBytes(n)),
        }
    }
}

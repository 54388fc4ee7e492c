//! # Error Definitions
//!
//! Failures of the envelope layer. Value-level failures are carried through
//! unchanged from `sodepack`.

use std::fmt;

/// Operational failures while framing or unframing a message.
#[derive(Debug)]
pub enum Error {
    /// The underlying sodepack serialization failed.
    Serialization(sodepack::Error),
    /// The fault presence byte was neither `0x00` nor `0x01`.
    InvalidFaultFlag(u8),
    /// A buffer held more bytes than the single message it was decoded as.
    TrailingBytes(usize),
}

impl Error {
    /// True if the failure came from the reader or writer rather than the data.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Serialization(sodepack::Error::Io(_)))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::InvalidFaultFlag(b) => write!(f, "Invalid fault flag byte: {:#04x}", b),
            Self::TrailingBytes(n) => write!(f, "{} trailing bytes after message", n),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sodepack::Error> for Error {
    fn from(e: sodepack::Error) -> Self {
        Self::Serialization(e)
    }
}

/// A specialized Result type for envelope operations.
pub type Result<T> = std::result::Result<T, Error>;

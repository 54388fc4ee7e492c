//! # Connection Errors

use std::fmt;
use std::io;

/// Failures while exchanging messages with a peer.
#[derive(Debug)]
pub enum Error {
    /// No resolved address for the peer accepted a connection.
    Connect { addr: String, source: io::Error },
    /// The stream failed (reset, broken pipe, ...).
    Io(io::Error),
    /// A connect, read or write deadline passed.
    Timeout,
    /// The peer closed the stream cleanly between messages.
    Closed,
    /// The bytes on the wire did not form a valid message.
    Codec(sodeprpc::Error),
    /// A reply arrived for a different request id.
    UnexpectedReply { expected: i64, found: i64 },
    /// An earlier failure left the stream in the middle of a message.
    Poisoned,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { addr, source } => write!(f, "Failed to connect to {}: {}", addr, source),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Timeout => write!(f, "Operation timed out"),
            Self::Closed => write!(f, "Connection closed by peer"),
            Self::Codec(e) => write!(f, "Protocol error: {}", e),
            Self::UnexpectedReply { expected, found } => {
                write!(f, "Reply id mismatch: expected {}, received {}", expected, found)
            }
            Self::Poisoned => write!(f, "Connection lost message framing and cannot be reused"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connect { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            Self::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            // blocking sockets report an expired read/write timeout as either
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(e),
        }
    }
}

impl From<sodeprpc::Error> for Error {
    fn from(e: sodeprpc::Error) -> Self {
        match e {
            // surface transport failures as-is, not as protocol errors
            sodeprpc::Error::Serialization(sodepack::Error::Io(io)) => io.into(),
            other => Self::Codec(other),
        }
    }
}

impl From<sodepack::Error> for Error {
    fn from(e: sodepack::Error) -> Self {
        sodeprpc::Error::from(e).into()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

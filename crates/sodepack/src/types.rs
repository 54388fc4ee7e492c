//! Core types for the sodepack binary format

use std::fmt;
use std::io;

/// Identifies the kind of scalar content carried by a value node.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// No content; nothing follows the tag.
    Absent = 0x00,
    /// A length-prefixed UTF-8 string follows.
    Text = 0x01,
    /// A big-endian `i32` follows.
    Int32 = 0x02,
    /// A big-endian IEEE-754 `f64` follows.
    Float64 = 0x03,
}

impl Tag {
    /// Returns the Tag variant for a given byte, or `None` if invalid.
    pub const fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Tag::Absent),
            0x01 => Some(Tag::Text),
            0x02 => Some(Tag::Int32),
            0x03 => Some(Tag::Float64),
            _ => None,
        }
    }
}

/// Sodepack serialization and deserialization errors.
#[derive(Debug)]
pub enum Error {
    /// Byte does not correspond to a valid content `Tag`.
    InvalidTag(u8),
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// A length or count prefix on the wire was negative.
    InvalidLength(i32),
    /// Stream exhausted before the declared data was read.
    UnexpectedEnd,
    /// String or count exceeds what an `i32` prefix can express.
    BlobTooLarge(usize),
    /// A declared string length exceeds `Limits::max_string_len`.
    LengthLimitExceeded { len: usize, limit: usize },
    /// Value nesting exceeds `Limits::max_depth`.
    RecursionLimitExceeded { limit: usize },
    /// A single value tree exceeds `Limits::max_nodes`.
    NodeLimitExceeded { limit: usize },
    /// The underlying reader or writer failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidTag(b) => write!(f, "Invalid content tag byte: {:#04x}", b),
            Error::InvalidUtf8 => write!(f, "String data is not valid UTF-8"),
            Error::InvalidLength(n) => write!(f, "Negative length prefix: {}", n),
            Error::UnexpectedEnd => write!(f, "Stream ended before the declared data"),
            Error::BlobTooLarge(len) => write!(f, "Length {} does not fit an i32 prefix", len),
            Error::LengthLimitExceeded { len, limit } => {
                write!(f, "String length {} exceeds limit of {} bytes", len, limit)
            }
            Error::RecursionLimitExceeded { limit } => {
                write!(f, "Value nesting exceeds limit of {} levels", limit)
            }
            Error::NodeLimitExceeded { limit } => {
                write!(f, "Value tree exceeds limit of {} nodes", limit)
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEnd
        } else {
            Error::Io(e)
        }
    }
}

/// Specialized `Result` for sodepack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Bounds applied while encoding and decoding value trees.
///
/// The wire format itself places no bound on nesting or fan-out, so every
/// count read from the stream is checked against these before it is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting below the root value. The root sits at depth 0.
    pub max_depth: usize,
    /// Maximum number of nodes in one decoded value tree.
    pub max_nodes: usize,
    /// Maximum byte length of one decoded string.
    pub max_string_len: usize,
}

impl Limits {
    pub const DEFAULT_MAX_DEPTH: usize = 64;
    pub const DEFAULT_MAX_NODES: usize = 1 << 20;
    pub const DEFAULT_MAX_STRING_LEN: usize = 16 << 20;

    /// Limits that accept anything the wire format can express.
    ///
    /// Only use this with trusted peers: a hostile stream can then exhaust
    /// the stack or memory.
    pub const fn unbounded() -> Self {
        Self {
            max_depth: usize::MAX,
            max_nodes: usize::MAX,
            max_string_len: i32::MAX as usize,
        }
    }

    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub const fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub const fn with_max_string_len(mut self, max_string_len: usize) -> Self {
        self.max_string_len = max_string_len;
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_nodes: Self::DEFAULT_MAX_NODES,
            max_string_len: Self::DEFAULT_MAX_STRING_LEN,
        }
    }
}

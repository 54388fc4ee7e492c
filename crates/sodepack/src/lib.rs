//! # Sodepack
//!
//! The data model and primitive codec of SODEP, the binary message format
//! spoken by Jolie services.
//!
//! ## Philosophy
//!
//! - **Owned Trees**: A `Value` owns its children outright. No cycles, no sharing.
//! - **Closed Content**: Leaf content is a closed enum; there is no "unknown type" at runtime.
//! - **Bounded**: Decoders enforce explicit `Limits` on depth, node count and string length.
//! - **Streaming**: Encoders write to any `io::Write`, decoders read from any `io::Read`.
//!
//! ## Format
//!
//! - **Strings**: `[Len: i32][UTF-8: Len]`
//! - **Content**: `[Tag: 1b][Data: N]`
//! - **Values**: `[Content][Names: i32]([Name][Count: i32][Value * Count]) * Names`
//!
//! All integers are Big-Endian.

pub mod types;
pub mod value;
pub mod encoder;
pub mod decoder;

pub use types::Error;
pub use types::Limits;
pub use types::Result;
pub use types::Tag;

pub use value::Content;
pub use value::Value;

pub use encoder::Encoder;
pub use decoder::Decoder;

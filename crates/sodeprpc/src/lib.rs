//! # SodepRPC
//!
//! The SODEP message envelope on top of `sodepack`.
//!
//! ## Architecture
//!
//! A `Message` is a flat unit: id, resource path, operation name, an optional
//! `Fault` and a `Value` payload. There is no length prefix; message
//! boundaries follow from the self-describing counts of the value codec, so
//! a reader consumes exactly one message worth of bytes per call.
//!
//! ```text
//! Message ::= int64(id) String(resourcePath) String(operationName) Fault Value
//! Fault   ::= 0x00 | 0x01 String(name) Value(detail)
//! ```

pub mod error;
pub mod message;
pub mod frame;
pub mod scan;

pub use error::Error;
pub use error::Result;

pub use message::Fault;
pub use message::Message;

pub use frame::decode_fault;
pub use frame::decode_message;
pub use frame::encode_fault;
pub use frame::encode_message;
pub use frame::try_decode_message;

pub use scan::MessageScanner;

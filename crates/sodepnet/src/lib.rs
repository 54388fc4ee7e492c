//! # Sodepnet
//!
//! Connections that exchange SODEP messages over a byte stream.
//!
//! - `Connection` / `Client`: blocking, over any `Read + Write` (TCP by default).
//! - `AsyncConnection` / `AsyncClient`: tokio, over any `AsyncRead + AsyncWrite`.
//!
//! One message is in flight per direction per connection. Every I/O method
//! takes `&mut self`; callers that share a connection serialize access
//! themselves, or open one connection per concurrent conversation.

pub mod error;
pub mod config;
pub mod connection;
pub mod async_connection;

pub use error::Error;
pub use error::Result;

pub use config::ClientConfig;

pub use connection::Client;
pub use connection::Connection;

pub use async_connection::AsyncClient;
pub use async_connection::AsyncConnection;

pub use sodepack::Content;
pub use sodepack::Limits;
pub use sodepack::Value;
pub use sodeprpc::Fault;
pub use sodeprpc::Message;

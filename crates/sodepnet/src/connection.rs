//! # Blocking Connection
//!
//! Sends and receives whole messages over any `Read + Write` stream.
//!
//! ## Invariants
//! - **Whole Writes**: A message is encoded in memory before any byte reaches
//!   the stream, so an encode failure never leaves a partial message behind.
//! - **Exact Reads**: Reading a message consumes exactly its bytes. Anything
//!   the peer sent after it stays buffered for the next read.
//! - **Poisoning**: A failure after some bytes of a message have crossed the
//!   stream leaves the two sides out of step. Every later read or write then
//!   fails with `Error::Poisoned`.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::net::Shutdown;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::time::Duration;

use sodepack::Decoder;
use sodepack::Encoder;
use sodepack::Limits;
use sodeprpc::Message;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::error::Result;

/// A blocking SODEP connection.
pub struct Connection<S: Read + Write> {
    reader: BufReader<S>,
    limits: Limits,
    poisoned: bool,
}

/// A blocking SODEP client over TCP.
pub type Client = Connection<TcpStream>;

impl<S: Read + Write> Connection<S> {
    pub fn new(stream: S) -> Self {
        Self::with_limits(stream, Limits::default())
    }

    pub fn with_limits(stream: S, limits: Limits) -> Self {
        Self { reader: BufReader::new(stream), limits, poisoned: false }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// True once a mid-message failure has made the stream unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }

    /// Encodes `msg` and writes it to the stream in full, then flushes.
    ///
    /// An encode failure leaves the connection usable. A failed or timed out
    /// write may have sent part of the message, so it poisons the connection.
    pub fn write_message(&mut self, msg: &Message) -> Result<()> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }

        let mut enc = Encoder::with_limits(Vec::new(), self.limits);
        sodeprpc::encode_message(&mut enc, msg)?;
        let bytes = enc.into_inner();

        let stream = self.reader.get_mut();
        if let Err(e) = stream.write_all(&bytes).and_then(|()| stream.flush()) {
            self.poisoned = true;
            warn!(id = msg.id(), error = %e, "write failed, connection poisoned");
            return Err(e.into());
        }

        trace!(id = msg.id(), op = msg.operation_name(), len = bytes.len(), "sent message");
        Ok(())
    }

    /// Blocks until one complete message has been read.
    ///
    /// # Errors
    /// - `Error::Closed` if the peer closed the stream before the first byte.
    /// - `Error::Codec` if the stream ended mid-message or held malformed data.
    /// - `Error::Timeout` if a configured read timeout expired.
    /// - `Error::Poisoned` if an earlier call failed mid-message.
    ///
    /// A timeout before the first byte of a message leaves the connection
    /// usable. Any failure after it, timeouts included, poisons it, since the
    /// bytes already consumed cannot be put back.
    pub fn read_message(&mut self) -> Result<Message> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        if self.reader.fill_buf()?.is_empty() {
            debug!("peer closed connection");
            return Err(Error::Closed);
        }

        let mut dec = Decoder::with_limits(&mut self.reader, self.limits);
        let msg = match sodeprpc::decode_message(&mut dec) {
            Ok(msg) => msg,
            Err(e) => {
                self.poisoned = true;
                warn!(error = %e, "read failed mid-message, connection poisoned");
                return Err(e.into());
            }
        };

        trace!(id = msg.id(), op = msg.operation_name(), fault = msg.is_fault(), "received message");
        Ok(msg)
    }

    /// Writes `request` and reads the reply, which must carry the same id.
    pub fn call(&mut self, request: &Message) -> Result<Message> {
        self.write_message(request)?;
        let reply = self.read_message()?;

        if reply.id() != request.id() {
            warn!(expected = request.id(), found = reply.id(), "reply id mismatch");
            return Err(Error::UnexpectedReply { expected: request.id(), found: reply.id() });
        }
        Ok(reply)
    }

    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

impl Connection<TcpStream> {
    /// Connects to `host:port`. A zero `timeout` waits as long as the OS allows.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let config = ClientConfig::default().with_connect_timeout(timeout);
        Self::connect_with(host, port, &config)
    }

    /// Connects to `host:port`, trying every resolved address in order.
    pub fn connect_with(host: &str, port: u16, config: &ClientConfig) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let candidates = (host, port)
            .to_socket_addrs()
            .map_err(|source| Error::Connect { addr: addr.clone(), source })?;

        let mut last_err = None;
        for candidate in candidates {
            match open(candidate, config.connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(config.nodelay)?;
                    stream.set_read_timeout(config.read_timeout)?;
                    stream.set_write_timeout(config.write_timeout)?;
                    debug!(%addr, peer = %candidate, "connected");
                    return Ok(Self::with_limits(stream, config.limits));
                }
                Err(e) => {
                    debug!(%addr, peer = %candidate, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        let source = last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses")
        });
        if source.kind() == std::io::ErrorKind::TimedOut {
            return Err(Error::Timeout);
        }
        Err(Error::Connect { addr, source })
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.get_ref().peer_addr()?)
    }

    /// Shuts down both directions. A peer that already left is not an error.
    pub fn close(self) -> Result<()> {
        match self.get_ref().shutdown(Shutdown::Both) {
            Err(e) if e.kind() != std::io::ErrorKind::NotConnected => Err(e.into()),
            _ => {
                debug!("connection closed");
                Ok(())
            }
        }
    }
}

fn open(addr: SocketAddr, timeout: Option<Duration>) -> std::io::Result<TcpStream> {
    match timeout {
        Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
        None => TcpStream::connect(addr),
    }
}

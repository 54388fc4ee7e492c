//! # Async Connection
//!
//! The tokio counterpart of `Connection`. Incoming bytes accumulate in a
//! buffer while a `MessageScanner` tracks how much of the next message has
//! arrived. Each message is decoded once, when its last byte is in; whatever
//! follows it is kept for the next read.
//!
//! Unlike the blocking connection, a read that times out mid-message keeps
//! its progress, so the read can simply be retried. A malformed message
//! structure, a stream error or a failed write poisons the connection.

use std::future::Future;
use std::io;
use std::time::Duration;

use sodepack::Decoder;
use sodepack::Encoder;
use sodepack::Limits;
use sodeprpc::Message;
use sodeprpc::MessageScanner;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::error::Result;

const READ_CHUNK: usize = 8 * 1024;

/// A SODEP connection driven by tokio.
pub struct AsyncConnection<S> {
    stream: S,
    buf: Vec<u8>,
    scanner: MessageScanner,
    limits: Limits,
    poisoned: bool,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

/// A SODEP client over a tokio TCP stream.
pub type AsyncClient = AsyncConnection<TcpStream>;

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncConnection<S> {
    pub fn new(stream: S) -> Self {
        Self::with_limits(stream, Limits::default())
    }

    pub fn with_limits(stream: S, limits: Limits) -> Self {
        Self {
            stream,
            buf: Vec::new(),
            scanner: MessageScanner::new(limits),
            limits,
            poisoned: false,
            read_timeout: None,
            write_timeout: None,
        }
    }

    /// Bounds every read from the stream. `None` waits forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    /// Bounds every write to the stream. `None` waits forever.
    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) {
        self.write_timeout = timeout;
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// True once a failure has made the stream unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Encodes `msg` and writes it to the stream in full, then flushes.
    ///
    /// An encode failure leaves the connection usable. A failed or timed out
    /// write may have sent part of the message, so it poisons the connection.
    pub async fn write_message(&mut self, msg: &Message) -> Result<()> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }

        let mut enc = Encoder::with_limits(Vec::new(), self.limits);
        sodeprpc::encode_message(&mut enc, msg)?;
        let bytes = enc.into_inner();

        let stream = &mut self.stream;
        let written = deadline(self.write_timeout, async {
            stream.write_all(&bytes).await?;
            stream.flush().await
        })
        .await;
        if let Err(e) = written {
            self.poisoned = true;
            warn!(id = msg.id(), error = %e, "write failed, connection poisoned");
            return Err(e);
        }

        trace!(id = msg.id(), op = msg.operation_name(), len = bytes.len(), "sent message");
        Ok(())
    }

    /// Waits until one complete message has arrived.
    ///
    /// # Errors
    /// - `Error::Closed` if the peer closed the stream between messages.
    /// - `Error::Codec` if the stream ended mid-message or held malformed data.
    /// - `Error::Timeout` if a single read waited longer than the read timeout.
    ///   Bytes received so far are kept, and a later call picks up from them.
    /// - `Error::Poisoned` if an earlier call lost track of message boundaries.
    pub async fn read_message(&mut self) -> Result<Message> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }

        loop {
            let len = match self.scanner.advance(&self.buf) {
                Ok(Some(len)) => len,
                Ok(None) => {
                    self.fill().await?;
                    continue;
                }
                Err(e) => return Err(self.poison(e.into())),
            };

            // the boundary is known, so a bad message does not desync the stream
            let mut dec = Decoder::with_limits(&self.buf[..len], self.limits);
            let decoded = sodeprpc::decode_message(&mut dec);
            self.buf.drain(..len);
            let msg = decoded?;

            trace!(id = msg.id(), op = msg.operation_name(), fault = msg.is_fault(), len, "received message");
            return Ok(msg);
        }
    }

    /// Reads at least one more byte into the buffer.
    async fn fill(&mut self) -> Result<()> {
        self.buf.reserve(READ_CHUNK);
        let stream = &mut self.stream;
        let buf = &mut self.buf;
        let n = match deadline(self.read_timeout, stream.read_buf(buf)).await {
            Ok(n) => n,
            Err(Error::Timeout) => return Err(Error::Timeout),
            Err(e) => return Err(self.poison(e)),
        };

        if n == 0 {
            if self.buf.is_empty() {
                debug!("peer closed connection");
                return Err(Error::Closed);
            }
            debug!(buffered = self.buf.len(), "peer closed connection mid-message");
            return Err(self.poison(sodepack::Error::UnexpectedEnd.into()));
        }
        Ok(())
    }

    fn poison(&mut self, e: Error) -> Error {
        self.poisoned = true;
        warn!(error = %e, "connection poisoned");
        e
    }

    /// Writes `request` and waits for the reply, which must carry the same id.
    pub async fn call(&mut self, request: &Message) -> Result<Message> {
        self.write_message(request).await?;
        let reply = self.read_message().await?;

        if reply.id() != request.id() {
            warn!(expected = request.id(), found = reply.id(), "reply id mismatch");
            return Err(Error::UnexpectedReply { expected: request.id(), found: reply.id() });
        }
        Ok(reply)
    }

    /// Shuts down the write half. A peer that already left is not an error.
    pub async fn close(mut self) -> Result<()> {
        match self.stream.shutdown().await {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e.into()),
            _ => {
                debug!("connection closed");
                Ok(())
            }
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl AsyncConnection<TcpStream> {
    /// Connects to `host:port`. A zero `timeout` waits as long as the OS allows.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let config = ClientConfig::default().with_connect_timeout(timeout);
        Self::connect_with(host, port, &config).await
    }

    /// Connects to `host:port`, trying every resolved address in order.
    pub async fn connect_with(host: &str, port: u16, config: &ClientConfig) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let stream = match config.connect_timeout {
            Some(t) => tokio::time::timeout(t, TcpStream::connect((host, port)))
                .await
                .map_err(|_| Error::Timeout)?,
            None => TcpStream::connect((host, port)).await,
        }
        .map_err(|source| Error::Connect { addr: addr.clone(), source })?;

        stream.set_nodelay(config.nodelay)?;
        debug!(%addr, peer = ?stream.peer_addr().ok(), "connected");

        let mut conn = Self::with_limits(stream, config.limits);
        conn.set_read_timeout(config.read_timeout);
        conn.set_write_timeout(config.write_timeout);
        Ok(conn)
    }
}

async fn deadline<T, F>(timeout: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match timeout {
        Some(t) => match tokio::time::timeout(t, fut).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(Error::Timeout),
        },
        None => Ok(fut.await?),
    }
}

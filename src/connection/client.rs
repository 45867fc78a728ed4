//! Store Client Connection
//!
//! A single TCP connection to the store, used strictly sequentially: write
//! one or more commands, flush once, then read exactly as many replies.
//!
//! ```text
//!   pipeline([DEBUG OBJECT k, TYPE k, TTL k])
//!        │
//!        ├── serialize all three into one buffer, write + flush
//!        │
//!        └── read_reply() x3 ──> parse from BytesMut, read more on Ok(None)
//! ```
//!
//! TCP is a stream, so one read can hold several replies or only part of
//! one. Bytes stay in the `BytesMut` buffer until a whole reply parses.

use crate::connection::target::ConnectionTarget;
use crate::protocol::{ParseError, RespParser, RespValue};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 16 * 1024;

/// Upper bound on buffered, not yet parsed reply bytes
const MAX_BUFFER_SIZE: usize = crate::protocol::parser::MAX_BULK_SIZE + 1024;

/// Traffic counters for one connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClientStats {
    /// Flushes to the server, one per query or pipeline
    pub round_trips: u64,
    /// Replies decoded
    pub replies: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Errors that can occur on the store connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The server sent something that is not RESP
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    /// The server closed the stream
    #[error("Connection closed by server")]
    Closed,

    /// Closed in the middle of a reply
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    #[error("Reply buffer limit exceeded")]
    BufferFull,

    /// AUTH or SELECT was refused
    #[error("Handshake rejected: {0}")]
    Rejected(String),
}

/// A client connection to the store.
pub struct Connection {
    stream: BufWriter<TcpStream>,

    /// Peer address (for logging)
    addr: String,

    /// Reply bytes not yet parsed
    buffer: BytesMut,

    parser: RespParser,

    stats: ClientStats,
}

impl Connection {
    /// Opens a plain TCP connection without any handshake.
    pub async fn connect(addr: &str) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(server = %addr, "Connected");

        Ok(Self {
            stream: BufWriter::new(stream),
            addr: addr.to_string(),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: RespParser::new(),
            stats: ClientStats::default(),
        })
    }

    /// Connects to `target`, authenticates and selects its database.
    pub async fn open(target: &ConnectionTarget) -> Result<Self, ConnectionError> {
        let mut conn = Self::connect(&target.address()).await?;

        if let Some(password) = &target.password {
            let auth = match &target.username {
                Some(user) => RespValue::command(["AUTH", user.as_str(), password.as_str()]),
                None => RespValue::command(["AUTH", password.as_str()]),
            };
            conn.expect_ok(auth).await?;
            debug!(server = %conn.addr, "Authenticated");
        }

        if target.db != 0 {
            let db = target.db.to_string();
            conn.expect_ok(RespValue::command(["SELECT", db.as_str()]))
                .await?;
            debug!(server = %conn.addr, db = target.db, "Selected database");
        }

        Ok(conn)
    }

    async fn expect_ok(&mut self, command: RespValue) -> Result<(), ConnectionError> {
        match self.query(command).await? {
            RespValue::Error(message) => Err(ConnectionError::Rejected(message)),
            _ => Ok(()),
        }
    }

    /// Sends one command and waits for its reply.
    ///
    /// Server error replies are returned as `RespValue::Error`, not as `Err`;
    /// only transport failures are errors here.
    pub async fn query(&mut self, command: RespValue) -> Result<RespValue, ConnectionError> {
        let mut replies = self.pipeline(std::slice::from_ref(&command)).await?;
        replies.pop().ok_or(ConnectionError::UnexpectedEof)
    }

    /// Sends all `commands` in one write and reads their replies in order.
    pub async fn pipeline(
        &mut self,
        commands: &[RespValue],
    ) -> Result<Vec<RespValue>, ConnectionError> {
        let mut out = Vec::new();
        for command in commands {
            command.serialize_into(&mut out);
        }
        self.stream.write_all(&out).await?;
        self.stream.flush().await?;
        self.stats.round_trips += 1;
        self.stats.bytes_written += out.len() as u64;
        trace!(server = %self.addr, commands = commands.len(), bytes = out.len(), "Sent pipeline");

        let mut replies = Vec::with_capacity(commands.len());
        for _ in commands {
            replies.push(self.read_reply().await?);
        }
        Ok(replies)
    }

    /// Reads the next complete reply, pulling more bytes as needed.
    async fn read_reply(&mut self) -> Result<RespValue, ConnectionError> {
        loop {
            if let Some((value, consumed)) = self.parser.parse(&self.buffer)? {
                let _ = self.buffer.split_to(consumed);
                self.stats.replies += 1;
                return Ok(value);
            }
            self.read_more_data().await?;
        }
    }

    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 4096 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Err(if self.buffer.is_empty() {
                ConnectionError::Closed
            } else {
                ConnectionError::UnexpectedEof
            });
        }

        self.stats.bytes_read += n as u64;
        trace!(server = %self.addr, bytes = n, "Read data");
        Ok(())
    }

    pub fn stats(&self) -> ClientStats {
        self.stats
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

//! Connection Handler Module
//!
//! Each client gets its own task that reads requests, runs them through the
//! [`CommandHandler`] and writes one reply per request.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects
//!        │
//!        ▼
//! 2. ┌──────────────────────────────────┐
//!    │  Read bytes into the buffer      │ <──────────┐
//!    └───────────────┬──────────────────┘            │
//!                    ▼                               │
//!    ┌──────────────────────────────────┐  incomplete│
//!    │  Parse buffered bytes            │ ───────────┘
//!    └───────────────┬──────────────────┘
//!                    ▼ request / syntax error
//!    ┌──────────────────────────────────┐
//!    │  Execute, reply, consume request │ ──> parse again
//!    └──────────────────────────────────┘
//!        │
//!        ▼
//! 3. Client disconnects / I/O error
//! ```
//!
//! ## Buffer Management
//!
//! Bytes accumulate in a `BytesMut` until they form one complete request.
//! A framed request split over several reads waits for the rest; a plain-text
//! line waits for its newline. Each executed request is split off the front,
//! so several lines from one read are answered in order before reading again.
//! The buffer is capped at 64 KiB.

use crate::commands::CommandHandler;
use crate::error::Error;
use crate::protocol::{parse_buffered, RespValue};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Maximum size for the read buffer (64 KB)
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Counters shared by every connection of a server.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    pub connections_accepted: AtomicU64,
    pub active_connections: AtomicU64,
    pub commands_processed: AtomicU64,
    /// Requests answered with a syntax error
    pub parse_errors: AtomicU64,
    pub bytes_read: AtomicU64,
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Serves one client over any byte stream (a `TcpStream` in the server).
pub struct ConnectionHandler<S = TcpStream> {
    stream: BufWriter<S>,

    /// Client address, for logging
    addr: SocketAddr,

    buffer: BytesMut,

    command_handler: CommandHandler,

    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            stats,
        }
    }

    /// Serves requests until the client disconnects or an I/O error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(response) = self.try_execute() {
                self.send_response(&response).await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Executes the request at the head of the buffer once it is complete.
    ///
    /// Returns `None` while more bytes are needed. A complete request is
    /// always consumed, whether it was valid or not.
    fn try_execute(&mut self) -> Option<RespValue> {
        let Some((consumed, parsed)) = parse_buffered(&self.buffer) else {
            trace!(
                client = %self.addr,
                buffered = self.buffer.len(),
                "Incomplete request, need more data"
            );
            return None;
        };
        self.buffer.advance(consumed);

        let response = match parsed {
            Ok(request) => {
                trace!(client = %self.addr, command = %request.name, "Parsed request");
                self.stats.command_processed();
                self.command_handler.execute(request)
            }
            Err(e) => {
                debug!(client = %self.addr, error = %e, "Parse error");
                self.stats.parse_error();
                RespValue::from(Error::Syntax)
            }
        };

        Some(response)
    }

    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            }
            return Err(ConnectionError::UnexpectedEof);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(())
    }

    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.addr, bytes = bytes.len(), "Sent response");
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client closed the stream between requests
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Client closed the stream in the middle of a request
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Serves a TCP client to completion, logging any abnormal end.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}

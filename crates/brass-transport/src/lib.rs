//! # Brass Transport
//!
//! Line-oriented network transport for the Brass IRC bot engine.
//!
//! The engine talks to the server exclusively through the [`LineTransport`]
//! trait: a non-blocking `read_line`, a `write_line` that appends CRLF, and
//! connection bookkeeping. Two implementations ship with this crate:
//!
//! | Transport | Description | Use Case |
//! |-----------|-------------|----------|
//! | [`TcpTransport`] | tokio `TcpStream` framed by newline | Production |
//! | [`MemoryTransport`] | scripted inbound queue, captured outbound lines | Tests |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  brass-runtime      │  (engine main loop)
//! ├─────────────────────┤
//! │  brass-transport    │  <- This crate
//! ├─────────────────────┤
//! │  Network (TCP)      │
//! └─────────────────────┘
//! ```
//!
//! Every line that crosses a transport is reported to a [`WireObserver`]; the
//! default observer emits `debug` events on the `brass::wire` target.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brass_transport::{LineTransport, TcpTransport, TransportOptions};
//!
//! let mut transport = TcpTransport::connect("irc.libera.chat", 6667, TransportOptions::default()).await?;
//! transport.write_line("NICK brass").await?;
//! if let Some(line) = transport.read_line()? {
//!     println!("{line}");
//! }
//! ```

pub mod error;
pub mod memory;
pub mod observer;
pub mod tcp;

use std::time::Duration;

use async_trait::async_trait;

pub use error::{TransportError, TransportResult};
pub use memory::{MemoryHandle, MemoryTransport};
pub use observer::{Direction, SharedObserver, TracingObserver, WireObserver, tracing_observer};
pub use tcp::TcpTransport;

/// A bidirectional, line-framed connection to an IRC server.
#[async_trait]
pub trait LineTransport: Send {
    /// Returns the next complete inbound line without its terminator.
    ///
    /// Never blocks: `Ok(None)` means no complete line is buffered yet.
    /// End of stream and an exceeded read-idle timeout are reported as
    /// errors.
    fn read_line(&mut self) -> TransportResult<Option<String>>;

    /// Trims `line`, appends CRLF, then writes and flushes it.
    async fn write_line(&mut self, line: &str) -> TransportResult<()>;

    /// Returns `true` until the connection is closed or lost.
    fn is_connected(&self) -> bool;

    /// Closes the connection. Calling this twice is a no-op.
    async fn close(&mut self);

    /// Human-readable peer description, used in logs.
    fn peer(&self) -> String;
}

/// Options shared by network transports.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Deadline for establishing the connection.
    pub connect_timeout: Duration,
    /// A connection that receives nothing for this long is considered lost.
    pub read_timeout: Duration,
    /// Longest inbound line accepted, terminator included.
    pub max_line_length: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(600),
            max_line_length: 8192,
        }
    }
}

impl TransportOptions {
    /// Sets the read-idle timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Prepares an outbound line: trims surrounding whitespace and rejects
/// embedded line breaks, which would smuggle a second command onto the wire.
pub(crate) fn prepare_outbound(line: &str) -> TransportResult<&str> {
    let line = line.trim();
    if line.contains(['\r', '\n']) {
        return Err(TransportError::SendFailed(
            "line contains an embedded line break".to_string(),
        ));
    }
    Ok(line)
}

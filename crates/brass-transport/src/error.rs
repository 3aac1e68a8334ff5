//! Transport error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {addr} - {reason}")]
    ConnectionFailed {
        /// The address that failed to connect.
        addr: String,
        /// Reason for failure.
        reason: String,
    },

    /// The remote end closed the connection.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Nothing was received for longer than the read timeout.
    #[error("no data received for {idle:?}")]
    Timeout {
        /// How long the connection has been idle.
        idle: Duration,
    },

    /// A line could not be written.
    #[error("failed to send line: {0}")]
    SendFailed(String),

    /// The transport has already been closed.
    #[error("transport is not connected")]
    NotConnected,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Returns `true` if the connection can no longer be used.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::SendFailed(_))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

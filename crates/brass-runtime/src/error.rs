//! Engine error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use brass_transport::TransportError;

use crate::config::ConfigError;

/// Errors that end an engine run.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The server could not be reached.
    #[error("Unable to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: TransportError,
    },

    /// Registration did not complete.
    #[error("Login failed: {reason}")]
    Login { reason: String },

    /// The login deadline passed before the server welcomed us.
    #[error("Login timed out after {0:?}")]
    LoginTimeout(Duration),

    /// The server sent `ERROR`.
    #[error("Server closed the session: {0}")]
    ProtocolFatal(String),

    /// The connection dropped or went idle while operating.
    #[error("Connection lost: {0}")]
    ConnectionLost(#[source] TransportError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The channel snapshot could not be read or written.
    #[error("Channel state at {path}: {reason}")]
    State { path: PathBuf, reason: String },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

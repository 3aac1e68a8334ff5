//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// A configuration that could not be loaded or would not work.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The layered sources could not be extracted into the schema.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A required value is empty.
    #[error("Missing required configuration field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid port number: {0}")]
    InvalidPort(u16),

    /// The nickname would be rejected by the server.
    #[error("Invalid nickname '{0}': use letters, digits and <_-[]^{{}}")]
    InvalidNickname(String),

    #[error("Invalid channel name {0:?}")]
    InvalidChannel(String),

    /// Any other out-of-range or inconsistent value.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::ParseError(e.to_string())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

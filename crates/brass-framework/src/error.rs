//! Error types for the Brass module system.

use std::time::Duration;

use thiserror::Error;

/// A module hook that did not complete normally.
///
/// These never escape the dispatcher: each one is logged with the module name
/// and the hook that failed, and dispatch continues with the next module.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The hook returned an error.
    #[error("module '{module}' failed in {hook}: {source:#}")]
    Failed {
        /// Module name.
        module: String,
        /// Hook name, e.g. `on_channel_message` or `load`.
        hook: &'static str,
        /// The error the module returned.
        source: anyhow::Error,
    },

    /// The hook panicked.
    #[error("module '{module}' panicked in {hook}: {message}")]
    Panicked {
        /// Module name.
        module: String,
        /// Hook name.
        hook: &'static str,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// The hook exceeded the per-invocation deadline.
    #[error("module '{module}' timed out in {hook} after {after:?}")]
    TimedOut {
        /// Module name.
        module: String,
        /// Hook name.
        hook: &'static str,
        /// The deadline that was exceeded.
        after: Duration,
    },

    /// No compiled-in module has this name.
    #[error("unknown module '{0}'")]
    Unknown(String),
}

impl ModuleError {
    /// Name of the module involved.
    pub fn module(&self) -> &str {
        match self {
            Self::Failed { module, .. }
            | Self::Panicked { module, .. }
            | Self::TimedOut { module, .. } => module,
            Self::Unknown(module) => module,
        }
    }
}

/// Result type for module operations.
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

//! Brass Runtime - connection engine and process plumbing for the Brass IRC
//! bot engine.
//!
//! This crate provides:
//! - The connection [`Engine`] (connect, login, main loop, restart)
//! - Layered configuration ([`config`])
//! - Logging setup ([`logging`])
//! - Channel state persistence across restarts ([`StateStore`])
//! - Signal handling that cancels the engine gracefully ([`signal`])
//!
//! ```ignore
//! use brass_runtime::{Engine, config::load_config, logging};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let engine = Engine::builder(config).build()?;
//!     brass_runtime::signal::spawn_signal_handler(engine.shutdown_token());
//!
//!     let outcome = engine.run().await?;
//!     std::process::exit(outcome.exit_code());
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod signal;
pub mod state;

pub use config::{BrassConfig, ConfigError, ConfigLoader, ConfigResult, Profile};
pub use engine::{ConfigReloader, Engine, EngineBuilder, EngineState, RESTART_EXIT_CODE, Shutdown};
pub use error::{EngineError, EngineResult};
pub use logging::{init_from_config, try_init_from_config};
pub use state::StateStore;

pub use tokio_util::sync::CancellationToken;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Commonly used logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}

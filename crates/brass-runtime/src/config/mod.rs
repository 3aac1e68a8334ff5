//! Layered configuration for the Brass engine.
//!
//! Defaults, TOML files, `BRASS_*` environment variables and programmatic
//! overrides are merged by [`ConfigLoader`] into a [`BrassConfig`], which
//! [`validate_config`] then checks before the engine starts.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    BrassConfig, EngineConfig, IdentityConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    ModulesConfig, ServerConfig, SpanEventConfig, StateConfig,
};
pub use validation::validate_config;

/// Loads configuration from the default locations and validates it.
pub fn load_config() -> ConfigResult<BrassConfig> {
    let config = ConfigLoader::new().load()?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads configuration from `path` (plus environment) and validates it.
pub fn load_config_from_file<P: AsRef<std::path::Path>>(path: P) -> ConfigResult<BrassConfig> {
    let config = ConfigLoader::new().file(path).load()?;
    validate_config(&config)?;
    Ok(config)
}

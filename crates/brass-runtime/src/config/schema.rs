//! Configuration schema definitions.
//!
//! Every section has serde defaults, so an empty file (or no file at all)
//! yields a complete [`BrassConfig`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use brass_framework::Discovery;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrassConfig {
    /// IRC server to connect to.
    #[serde(default)]
    pub server: ServerConfig,

    /// Nickname and username used at login.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Channels to join once logged in.
    #[serde(default)]
    pub channels: Vec<String>,

    /// Main loop timing.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Module discovery and per-module settings.
    #[serde(default)]
    pub modules: ModulesConfig,

    /// Restart state persistence.
    #[serde(default)]
    pub state: StateConfig,

    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Server / identity
// =============================================================================

/// Server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host name or address.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Sent with `PASS` before registering, if set.
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: None,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6667
}

/// Login identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_nickname")]
    pub nickname: String,

    #[serde(default = "default_username")]
    pub username: String,

    /// Real name for `USER`; the username is used when unset.
    #[serde(default)]
    pub realname: Option<String>,
}

impl IdentityConfig {
    /// The real name sent with `USER`.
    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.username)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            nickname: default_nickname(),
            username: default_username(),
            realname: None,
        }
    }
}

fn default_nickname() -> String {
    "brassbot".to_string()
}

fn default_username() -> String {
    "brass".to_string()
}

// =============================================================================
// Engine
// =============================================================================

/// Main loop timing and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sleep between loop iterations, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Connection is considered lost after this long without inbound data.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// TCP connect deadline.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Deadline for the server's `004` after sending login lines.
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,

    /// Per-hook deadline. Unset means hooks may run as long as they like.
    #[serde(default)]
    pub module_timeout_ms: Option<u64>,

    /// Argument for `PONG`. Defaults to the machine host name.
    #[serde(default)]
    pub local_host: Option<String>,
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn module_timeout(&self) -> Option<Duration> {
        self.module_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            read_timeout_secs: default_read_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            login_timeout_secs: default_login_timeout_secs(),
            module_timeout_ms: None,
            local_host: None,
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    250
}

fn default_read_timeout_secs() -> u64 {
    600
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_login_timeout_secs() -> u64 {
    120
}

// =============================================================================
// Modules / state
// =============================================================================

/// Which modules to load and how to configure them.
///
/// ```toml
/// [modules]
/// enabled = ["help", "bot_control"]
///
/// [modules.config.bot_control]
/// operators = ["alice"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Module names to load, in order. Unset loads every compiled-in module.
    #[serde(default)]
    pub enabled: Option<Vec<String>>,

    /// Directory whose file names select the modules to load.
    ///
    /// Takes precedence over `enabled`.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Per-module configuration tables, keyed by module name.
    #[serde(default)]
    pub config: HashMap<String, Value>,
}

impl ModulesConfig {
    /// How the dispatcher should discover modules.
    pub fn discovery(&self) -> Discovery {
        if let Some(dir) = &self.directory {
            Discovery::Directory(dir.clone())
        } else if let Some(enabled) = &self.enabled {
            Discovery::Explicit(enabled.clone())
        } else {
            Discovery::All
        }
    }
}

/// Restart state persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Channel snapshot written on restart and replayed at the next start.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("channelstate.json")
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase name, as used in filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// The matching `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "invalid log level '{other}', expected one of trace, debug, info, warn, error"
            )),
        }
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    #[cfg(feature = "json-log")]
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires `file_path`.
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log every line sent and received on the `brass::wire` target.
    #[serde(default)]
    pub wire: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-target levels, e.g. `brass_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BrassConfig::default();
        assert_eq!(config.server.port, 6667);
        assert_eq!(config.engine.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.engine.read_timeout(), Duration::from_secs(600));
        assert_eq!(config.engine.login_timeout(), Duration::from_secs(120));
        assert_eq!(config.engine.module_timeout(), None);
        assert_eq!(config.state.snapshot_path, PathBuf::from("channelstate.json"));
        assert_eq!(config.identity.realname(), "brass");
    }

    #[test]
    fn test_discovery_precedence() {
        let mut modules = ModulesConfig::default();
        assert!(matches!(modules.discovery(), Discovery::All));

        modules.enabled = Some(vec!["help".into()]);
        assert!(matches!(modules.discovery(), Discovery::Explicit(ref v) if v == &["help"]));

        modules.directory = Some(PathBuf::from("plugins"));
        assert!(matches!(modules.discovery(), Discovery::Directory(_)));
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }
}

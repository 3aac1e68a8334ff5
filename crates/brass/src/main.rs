//! The `brass` executable.
//!
//! # Configuration
//!
//! Configuration is layered, later sources winning:
//!
//! 1. Built-in defaults
//! 2. `brass.toml` / `config.toml` in the working directory and the user
//!    config directory, or the file given with `--config`
//! 3. Environment variables (`BRASS_SERVER__HOST`, `BRASS_LOGGING__LEVEL`, ...)
//! 4. Command-line flags
//!
//! # Exit status
//!
//! `0` after a requested or signalled shutdown, `75` when a module asked for
//! a restart (the supervisor is expected to start the bot again), `1` when
//! the engine failed.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use brass_runtime::config::validate_config;
use brass_runtime::{BrassConfig, ConfigLoader, Engine, Shutdown, logging, signal};

/// A modular IRC bot.
#[derive(Parser, Debug)]
#[command(name = "brass")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (default: search for brass.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Configuration profile (overrides BRASS_PROFILE)
    #[arg(long)]
    profile: Option<String>,

    /// Override the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Override the server host
    #[arg(long)]
    host: Option<String>,

    /// Override the server port
    #[arg(long)]
    port: Option<u16>,

    /// Override the nickname
    #[arg(long)]
    nick: Option<String>,

    /// List the compiled-in modules and exit
    #[arg(long)]
    list_modules: bool,
}

impl Args {
    fn loader(&self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();
        if let Some(profile) = &self.profile {
            loader = loader.profile(profile);
        }
        if let Some(path) = &self.config {
            loader = loader.file(path);
        }
        if let Some(level) = &self.log_level {
            loader = loader.set("logging.level", level);
        }
        if let Some(host) = &self.host {
            loader = loader.set("server.host", host);
        }
        if let Some(port) = self.port {
            loader = loader.set("server.port", port);
        }
        if let Some(nick) = &self.nick {
            loader = loader.set("identity.nickname", nick);
        }
        loader
    }

    fn load_config(&self) -> Result<BrassConfig> {
        let config = self.loader().load().context("failed to load configuration")?;
        validate_config(&config).context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_modules {
        for name in brass_framework::available_modules() {
            println!("{name}");
        }
        return ExitCode::SUCCESS;
    }

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("brass: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    logging::init_from_config(&config.logging);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args, config)) {
        Ok(outcome) => ExitCode::from(outcome.exit_code() as u8),
        Err(e) => {
            error!(error = %format!("{e:#}"), "Engine stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, config: BrassConfig) -> Result<Shutdown> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        modules = ?brass_plugins::linked_modules(),
        "Starting brass"
    );

    let engine = Engine::builder(config)
        .config_reloader(move || args.loader().load())
        .build()?;
    let _signals = signal::spawn_signal_handler(engine.shutdown_token());

    let outcome = engine.run().await?;
    match &outcome {
        Shutdown::Restart { reason } => info!(reason = %reason, "Exiting for restart"),
        other => info!(outcome = ?other, "Exiting"),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from([
            "brass",
            "-c",
            "bot.toml",
            "--log-level",
            "debug",
            "--port",
            "6697",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("bot.toml")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.port, Some(6697));
        assert!(!args.list_modules);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from(["brass", "--host", "irc.example.org", "--nick", "tester"]);
        let config = args.loader().without_env().load().unwrap();
        assert_eq!(config.server.host, "irc.example.org");
        assert_eq!(config.identity.nickname, "tester");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args::parse_from(["brass", "--config", "/nonexistent/brass.toml"]);
        assert!(args.load_config().is_err());
    }
}

//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! ```rust,ignore
//! use brass_runtime::logging;
//!
//! logging::init_from_config(&config.logging);
//! ```
//!
//! Protocol traffic is logged at `debug` on the `brass::wire` target. It is
//! filtered out at the default level; set `logging.wire = true` (or
//! `RUST_LOG=brass::wire=debug`) to see every line sent and received.

use std::ffi::OsStr;
use std::path::Path;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

/// Target used for wire traffic.
pub const WIRE_TARGET: &str = "brass::wire";

/// Initializes logging from a [`LoggingConfig`].
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = try_init_from_config(config);
}

/// Installs the global subscriber described by `config`.
pub fn try_init_from_config(config: &LoggingConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(fmt_layer(config, make_writer(config)))
        .with(env_filter(config))
        .try_init()
}

/// Filter directives applied on top of the base level, sorted by target.
///
/// The wire directive comes last so a `brass::wire` entry in `filters`
/// cannot hide traffic when `wire` is on.
pub fn directives(config: &LoggingConfig) -> Vec<String> {
    let mut directives: Vec<String> = config
        .filters
        .iter()
        .map(|(target, level)| format!("{target}={level}"))
        .collect();
    directives.sort();
    if config.wire {
        directives.push(format!("{WIRE_TARGET}=debug"));
    }
    directives
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    for directive in directives(config) {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("ignoring invalid log directive '{directive}': {e}"),
        }
    }
    filter
}

fn span_events(config: &SpanEventConfig) -> FmtSpan {
    let mut span = FmtSpan::NONE;
    if config.new {
        span |= FmtSpan::NEW;
    }
    if config.enter {
        span |= FmtSpan::ENTER;
    }
    if config.exit {
        span |= FmtSpan::EXIT;
    }
    if config.close {
        span |= FmtSpan::CLOSE;
    }
    span
}

fn make_writer(config: &LoggingConfig) -> BoxMakeWriter {
    match (config.output, &config.file_path) {
        (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
        (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
        (LogOutput::File, Some(path)) => BoxMakeWriter::new(tracing_appender::rolling::never(
            path.parent().unwrap_or_else(|| Path::new(".")),
            path.file_name().unwrap_or_else(|| OsStr::new("brass.log")),
        )),
        (LogOutput::File, None) => {
            eprintln!("logging.output is \"file\" but logging.file_path is unset, using stdout");
            BoxMakeWriter::new(std::io::stdout)
        }
    }
}

fn fmt_layer(
    config: &LoggingConfig,
    writer: BoxMakeWriter,
) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(config.output != LogOutput::File)
        .with_span_events(span_events(&config.span_events))
        .with_thread_ids(config.thread_ids)
        .with_file(config.file_location)
        .with_line_number(config.file_location);

    match config.format {
        #[cfg(feature = "json-log")]
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Full => layer.boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_directives_from_config() {
        let mut config = LoggingConfig::default();
        config.level = LogLevel::Warn;
        config.wire = true;
        config.filters.insert("brass_transport".into(), LogLevel::Trace);
        config.filters.insert("brass_framework".into(), LogLevel::Debug);

        assert_eq!(
            directives(&config),
            vec![
                "brass_framework=debug".to_string(),
                "brass_transport=trace".to_string(),
                "brass::wire=debug".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_directives_by_default() {
        assert!(directives(&LoggingConfig::default()).is_empty());
    }

    #[test]
    fn test_span_events_from_config() {
        let config = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(span_events(&config), FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(span_events(&SpanEventConfig::default()), FmtSpan::NONE);
    }
}

//! Configuration validation.

use brass_core::ident::is_valid_nick;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BrassConfig, EngineConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &BrassConfig) -> ConfigResult<()> {
    validate_server(config)?;
    validate_identity(config)?;
    validate_channels(&config.channels)?;
    validate_engine(&config.engine)?;
    validate_logging(&config.logging)?;
    Ok(())
}

fn validate_server(config: &BrassConfig) -> ConfigResult<()> {
    if config.server.host.trim().is_empty() {
        return Err(ConfigError::missing_field("server.host"));
    }
    if config.server.port == 0 {
        return Err(ConfigError::InvalidPort(config.server.port));
    }
    Ok(())
}

fn validate_identity(config: &BrassConfig) -> ConfigResult<()> {
    let nickname = &config.identity.nickname;
    if nickname.is_empty() {
        return Err(ConfigError::missing_field("identity.nickname"));
    }
    if !is_valid_nick(nickname) {
        return Err(ConfigError::InvalidNickname(nickname.clone()));
    }

    let username = &config.identity.username;
    if username.trim().is_empty() {
        return Err(ConfigError::missing_field("identity.username"));
    }
    if username.contains(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Username must not contain whitespace: {username:?}"
        )));
    }
    Ok(())
}

fn validate_channels(channels: &[String]) -> ConfigResult<()> {
    for channel in channels {
        let name = channel.trim().trim_start_matches('#');
        if name.is_empty() || name.contains([' ', ',', '\x07']) {
            return Err(ConfigError::InvalidChannel(channel.clone()));
        }
    }
    Ok(())
}

fn validate_engine(engine: &EngineConfig) -> ConfigResult<()> {
    if engine.tick_interval_ms == 0 {
        return Err(ConfigError::validation(
            "Tick interval must be greater than 0",
        ));
    }
    if engine.read_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Read timeout must be greater than 0",
        ));
    }
    if engine.login_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Login timeout must be greater than 0",
        ));
    }
    if engine.module_timeout_ms == Some(0) {
        return Err(ConfigError::validation(
            "Module timeout must be greater than 0 when set",
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    if logging.filters.keys().any(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation("Log filter target must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = BrassConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_host() {
        let mut config = BrassConfig::default();
        config.server.host = "  ".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = BrassConfig::default();
        config.server.port = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidPort(0))
        ));
    }

    #[test]
    fn test_validate_nickname() {
        let mut config = BrassConfig::default();
        config.identity.nickname = "bad nick".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidNickname(_))
        ));

        config.identity.nickname = "[brass]^bot".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_tick_interval() {
        let mut config = BrassConfig::default();
        config.engine.tick_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_channels() {
        let mut config = BrassConfig::default();
        config.channels = vec!["#rust".into(), "brass".into()];
        assert!(validate_config(&config).is_ok());

        config.channels.push("#".into());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidChannel(_))
        ));
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = BrassConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
    }
}

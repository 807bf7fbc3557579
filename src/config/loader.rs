//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServerConfig;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServerConfig = toml::from_str(&content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Semantic checks beyond what serde enforces.
fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.limits.max_connections == 0 {
        return Err(ConfigError::Validation(
            "limits.max_connections must be at least 1".to_string(),
        ));
    }
    if config.limits.max_body_bytes == 0 {
        return Err(ConfigError::Validation(
            "limits.max_body_bytes must be at least 1".to_string(),
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        return Err(ConfigError::Validation(format!(
            "observability.metrics_address is not a socket address: {}",
            config.observability.metrics_address
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn rejects_zero_body_limit() {
        let mut config = ServerConfig::default();
        config.limits.max_body_bytes = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn parses_minimal_toml() {
        let config: ServerConfig = toml::from_str(
            r#"
            access_control_allow_origin = "*"

            [network]
            ip = "127.0.0.1"
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.network.port, 9000);
        assert_eq!(config.cors_origin(), Some("*"));
        assert_eq!(config.limits.max_body_bytes, 64 * 1024);
    }
}

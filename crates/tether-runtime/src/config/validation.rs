//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ClientSettings, QueueSettings, RetrySettings, TetherConfig};

/// Validates the entire configuration.
///
/// Log levels and formats are enums, so unknown values are already rejected
/// when the configuration is extracted.
pub fn validate_config(config: &TetherConfig) -> ConfigResult<()> {
    validate_client_config(&config.client)?;
    Ok(())
}

/// Validates client settings.
fn validate_client_config(client: &ClientSettings) -> ConfigResult<()> {
    if client.host.trim().is_empty() {
        return Err(ConfigError::missing_field("client.host"));
    }

    if client.port == 0 {
        return Err(ConfigError::InvalidPort(client.port));
    }

    if client.connect_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "Connect timeout must be greater than 0",
        ));
    }

    if client.pool_size == 0 {
        return Err(ConfigError::validation("Pool size must be greater than 0"));
    }

    validate_queue_config("request_queue", &client.request_queue)?;
    validate_queue_config("socket_queue", &client.socket_queue)?;
    validate_retry_config(&client.retry)?;

    Ok(())
}

/// Validates one queue's settings.
fn validate_queue_config(name: &str, queue: &QueueSettings) -> ConfigResult<()> {
    if queue.batch_size == 0 {
        return Err(ConfigError::validation(format!(
            "{name}.batch_size must be greater than 0"
        )));
    }

    if queue.poll_interval_ms == 0 {
        return Err(ConfigError::validation(format!(
            "{name}.poll_interval_ms must be greater than 0"
        )));
    }

    Ok(())
}

/// Validates retry configuration.
fn validate_retry_config(retry: &RetrySettings) -> ConfigResult<()> {
    if retry.period_ms == 0 || retry.tick_ms == 0 {
        return Err(ConfigError::validation(
            "Retry period and tick must be greater than 0",
        ));
    }

    if retry.max_attempts == 0 {
        return Err(ConfigError::validation(
            "Retry max_attempts must be greater than 0",
        ));
    }

    if retry.reconnect_every == 0 {
        return Err(ConfigError::validation(
            "Retry reconnect_every must be greater than 0",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = TetherConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_host() {
        let mut config = TetherConfig::default();
        config.client.host = "  ".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = TetherConfig::default();
        config.client.port = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidPort(0))
        ));
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let mut config = TetherConfig::default();
        config.client.socket_queue.batch_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("socket_queue.batch_size"));
    }

    #[test]
    fn test_validate_zero_reconnect_every() {
        let mut config = TetherConfig::default();
        config.client.retry.reconnect_every = 0;
        assert!(validate_config(&config).is_err());
    }
}

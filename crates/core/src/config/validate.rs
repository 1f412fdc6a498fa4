use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Downloader path is set and its timeout is positive
/// - Metadata lane admits at least one fetch
/// - Persistence interval is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.downloader.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "downloader.path cannot be empty".to_string(),
        ));
    }

    if config.downloader.metadata_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "downloader.metadata_timeout_secs must be greater than 0".to_string(),
        ));
    }

    if config.queue.metadata_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "queue.metadata_concurrency must be at least 1".to_string(),
        ));
    }

    if config.persistence.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "persistence.interval_secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_empty_downloader_path_fails() {
        let mut config = Config::default();
        config.downloader.path = PathBuf::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_metadata_lane_fails() {
        let mut config = Config::default();
        config.queue.metadata_concurrency = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("metadata_concurrency"));
    }

    #[test]
    fn test_validate_zero_interval_fails() {
        let mut config = Config::default();
        config.persistence.interval_secs = 0;
        assert!(validate_config(&config).is_err());
    }
}

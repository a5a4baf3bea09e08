use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Database path is not empty
/// - At least one episode extension is configured
/// - Worker pool size is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.database.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "database.path cannot be empty".to_string(),
        ));
    }

    if config.library.extensions.is_empty() {
        return Err(ConfigError::ValidationError(
            "library.extensions cannot be empty".to_string(),
        ));
    }

    if config.workers.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "workers.max_concurrent cannot be 0".to_string(),
        ));
    }

    Ok(())
}

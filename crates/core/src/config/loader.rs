use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `EPISODIC_WORKERS__MAX_CONCURRENT=8`
const ENV_PREFIX: &str = "EPISODIC_";

fn env_overrides() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

/// Platform config location (`~/.config/episodic/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("episodic").join("config.toml"))
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(env_overrides())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from file if it exists, otherwise from defaults.
/// Environment overrides apply either way.
///
/// A missing file is created with the default settings so the next run has
/// something to edit. Failing to write it is logged, not fatal.
pub fn load_config_or_default(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        return load_config(path);
    }

    match write_default_config(path) {
        Ok(()) => info!("Wrote default configuration to {:?}", path),
        Err(e) => warn!("Could not write default configuration to {:?}: {}", path, e),
    }

    Figment::from(Serialized::defaults(Config::default()))
        .merge(env_overrides())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(&Config::default())
        .map_err(|e| ConfigError::WriteError(e.to_string()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
    }
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

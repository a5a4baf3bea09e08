use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("episodic.db")
}

/// Library configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Directory holding one sub-directory per show
    #[serde(default = "default_library_root")]
    pub root: PathBuf,
    /// File extensions counted as episodes (case-insensitive, leading dot optional)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: default_library_root(),
            extensions: default_extensions(),
        }
    }
}

fn default_library_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_extensions() -> Vec<String> {
    ["mkv", "mp4", "avi", "webm", "m4v"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

/// Store worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Maximum store calls running at once (default: 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.database.path.to_str().unwrap(), "episodic.db");
        assert_eq!(config.library.root.to_str().unwrap(), ".");
        assert_eq!(config.library.extensions.len(), 5);
        assert_eq!(config.workers.max_concurrent, 4);
    }

    #[test]
    fn test_deserialize_with_custom_database_path() {
        let toml = r#"
[database]
path = "/data/my-db.sqlite"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.path.to_str().unwrap(), "/data/my-db.sqlite");
    }

    #[test]
    fn test_deserialize_library_config() {
        let toml = r#"
[library]
root = "/media/anime"
extensions = ["mkv"]

[workers]
max_concurrent = 2
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.library.root.to_str().unwrap(), "/media/anime");
        assert_eq!(config.library.extensions, vec!["mkv"]);
        assert_eq!(config.workers.max_concurrent, 2);
    }

    #[test]
    fn test_deserialize_partial_library_keeps_default_extensions() {
        let toml = r#"
[library]
root = "/media/anime"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.library.extensions.contains(&"mkv".to_string()));
    }

    #[test]
    fn test_deserialize_invalid_type_fails() {
        let toml = r#"
[workers]
max_concurrent = "lots"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}

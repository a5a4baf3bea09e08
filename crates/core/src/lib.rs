pub mod config;
pub mod handle;
pub mod library;
pub mod store;

pub use config::{
    default_config_path, load_config, load_config_from_str, load_config_or_default,
    validate_config, Config, ConfigError, DatabaseConfig, LibraryConfig, WorkerConfig,
};
pub use handle::{ReconcileSummary, StoreHandle};
pub use library::{LibraryScanner, ScanError};
pub use store::{DeltaSummary, EpisodeStore, Snapshot, SqliteEpisodeStore, StoreError};

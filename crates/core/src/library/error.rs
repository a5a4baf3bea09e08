//! Error types for the library module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while scanning the library.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The configured library root does not exist or is not a directory.
    #[error("Library root not found: {path}")]
    RootNotFound { path: PathBuf },

    /// Failed to read a directory or entry.
    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub(crate) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

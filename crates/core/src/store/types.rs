//! Types for the episode store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// An observed (or materialized) view of the library: show name mapped to an
/// ordered list of episode paths.
///
/// Iteration order is insertion order, which for snapshots read back from the
/// store is show discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<(String, Vec<PathBuf>)>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the episode list for a show.
    ///
    /// A show that is already present keeps its position and has its list
    /// replaced; the previous list is returned.
    pub fn insert(
        &mut self,
        show: impl Into<String>,
        episodes: Vec<PathBuf>,
    ) -> Option<Vec<PathBuf>> {
        let show = show.into();
        match self.entries.iter_mut().find(|(name, _)| *name == show) {
            Some((_, existing)) => Some(std::mem::replace(existing, episodes)),
            None => {
                self.entries.push((show, episodes));
                None
            }
        }
    }

    /// Append a show known not to be present yet.
    pub(crate) fn push(&mut self, show: String, episodes: Vec<PathBuf>) {
        self.entries.push((show, episodes));
    }

    /// Episode list for a show, if the show is present.
    pub fn get(&self, show: &str) -> Option<&[PathBuf]> {
        self.entries
            .iter()
            .find(|(name, _)| name == show)
            .map(|(_, episodes)| episodes.as_slice())
    }

    /// Show names in order.
    pub fn shows(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// (show, episodes) pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.entries
            .iter()
            .map(|(name, episodes)| (name.as_str(), episodes.as_slice()))
    }

    /// Number of shows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of episode paths across all shows.
    pub fn episode_count(&self) -> usize {
        self.entries.iter().map(|(_, episodes)| episodes.len()).sum()
    }
}

impl<S, P> FromIterator<(S, Vec<P>)> for Snapshot
where
    S: Into<String>,
    P: AsRef<Path>,
{
    fn from_iter<I: IntoIterator<Item = (S, Vec<P>)>>(iter: I) -> Self {
        // A repeated show replaces its earlier list in place, like `insert`.
        let mut snapshot = Snapshot::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (show, episodes) in iter {
            let show = show.into();
            let episodes = episodes
                .iter()
                .map(|p| p.as_ref().to_path_buf())
                .collect();
            match positions.get(&show) {
                Some(&index) => snapshot.entries[index].1 = episodes,
                None => {
                    positions.insert(show.clone(), snapshot.entries.len());
                    snapshot.push(show, episodes);
                }
            }
        }
        snapshot
    }
}

// Serialized as a JSON object whose key order follows the snapshot order.
impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (show, episodes) in &self.entries {
            map.serialize_entry(show, episodes)?;
        }
        map.end()
    }
}

/// Outcome of an episode delta reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeltaSummary {
    /// Episodes newly recorded.
    pub inserted: usize,
    /// Stored episodes no longer present in the snapshot.
    pub deleted: usize,
}

/// Errors for episode store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Unknown show: {0}")]
    UnknownShow(String),

    #[error("Invalid path (not UTF-8): {0}")]
    InvalidPath(String),

    #[error("Database error: {0}")]
    Storage(String),
}

impl StoreError {
    /// Classify a SQLite error raised while writing `key`.
    ///
    /// Unique violations become `DuplicateKey`, foreign key violations become
    /// `UnknownShow`; everything else is a storage failure.
    pub(crate) fn from_sqlite(err: rusqlite::Error, key: &str) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
            if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                match failure.extended_code {
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        return StoreError::DuplicateKey(key.to_string());
                    }
                    rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        return StoreError::UnknownShow(key.to_string());
                    }
                    _ => {}
                }
            }
        }
        StoreError::Storage(err.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

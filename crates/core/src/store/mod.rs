//! Episode store - the persistent record of known shows and their episode files.
//!
//! The store is the single source of truth the rest of the application
//! reconciles against observed filesystem state. Shows are additive under
//! delta reconciliation; episodes follow the snapshot exactly.

mod sqlite;
mod types;

pub use sqlite::SqliteEpisodeStore;
pub use types::*;

use std::path::{Path, PathBuf};

/// Trait for episode storage backends.
///
/// Every write is atomic: it is either fully applied or leaves the store
/// exactly as it was.
pub trait EpisodeStore: Send + Sync {
    /// Create the schema if absent and apply pending migrations.
    ///
    /// Idempotent; never erases existing data.
    fn initial_setup(&self) -> Result<(), StoreError>;

    /// All show names, in discovery order.
    fn get_all_shows(&self) -> Result<Vec<String>, StoreError>;

    /// Look up a show's identifier by exact name.
    fn get_show_id_by_name(&self, name: &str) -> Result<Option<i64>, StoreError>;

    /// Episode paths of a show in insertion order.
    ///
    /// `None` when the show does not exist, an empty list when it exists
    /// without episodes.
    fn get_episodes_by_show_name(&self, name: &str) -> Result<Option<Vec<PathBuf>>, StoreError>;

    /// Every episode path, grouped by show in discovery order.
    fn get_all_episodes(&self) -> Result<Vec<PathBuf>, StoreError>;

    /// Materialize the whole store as a snapshot.
    fn get_all(&self) -> Result<Snapshot, StoreError>;

    /// Look up an episode's identifier by path.
    fn get_episode_id(&self, path: &Path) -> Result<Option<i64>, StoreError>;

    /// The episode to play after `last_watched`, or the first episode when
    /// nothing has been watched yet.
    fn next_episode(
        &self,
        show_name: &str,
        last_watched: Option<&Path>,
    ) -> Result<Option<PathBuf>, StoreError>;

    /// Insert a new show. Fails with `DuplicateKey` if the name exists.
    fn add_show(&self, name: &str) -> Result<i64, StoreError>;

    /// Insert one episode under an existing show.
    ///
    /// Fails with `UnknownShow` if the show is missing and `DuplicateKey` if
    /// the path is already recorded anywhere.
    fn add_episode_by_show_name(&self, path: &Path, show_name: &str) -> Result<i64, StoreError>;

    /// Add every show of the snapshot that is not stored yet.
    ///
    /// Shows missing from the snapshot are left untouched. Returns the number
    /// of shows added.
    fn write_all_shows_delta(&self, snapshot: &Snapshot) -> Result<usize, StoreError>;

    /// Make each snapshot show's episodes match the snapshot list exactly.
    ///
    /// Every show in the snapshot must already exist (run
    /// [`EpisodeStore::write_all_shows_delta`] first); otherwise the call
    /// fails with `UnknownShow` and nothing is written. Unchanged episodes keep
    /// their identifiers.
    fn write_all_episodes_delta(&self, snapshot: &Snapshot) -> Result<DeltaSummary, StoreError>;

    /// Remove shows that have no episodes. Returns the number removed.
    fn prune_empty_shows(&self) -> Result<usize, StoreError>;
}

//! Async handle over the episode store.
//!
//! Store calls are blocking SQLite work, so the handle dispatches them onto a
//! bounded pool of blocking workers and never runs them on the caller's task.
//! The handle is cheaply cloneable; pass it to whatever needs the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tracing::info;

use crate::store::{DeltaSummary, EpisodeStore, Snapshot, StoreError};

/// Outcome of a full library reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub shows_added: usize,
    pub episodes_inserted: usize,
    pub episodes_deleted: usize,
}

/// Shared, cloneable handle to the process-wide episode store.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn EpisodeStore>,
    workers: Arc<Semaphore>,
    /// Held across the shows delta and the episodes delta of one
    /// reconciliation.
    reconcile_lock: Arc<Mutex<()>>,
}

impl StoreHandle {
    /// Create a handle running at most `max_workers` store calls at once.
    pub fn new(store: Arc<dyn EpisodeStore>, max_workers: usize) -> Self {
        Self {
            store,
            workers: Arc::new(Semaphore::new(max_workers.max(1))),
            reconcile_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn EpisodeStore) -> Result<T, StoreError> + Send + 'static,
    {
        // The permit moves into the worker so it is held until the store call
        // returns, even if the caller stops waiting.
        let permit = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|_| StoreError::Storage("store worker pool closed".to_string()))?;

        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            op(store.as_ref())
        })
        .await
        .map_err(|e| StoreError::Storage(format!("store worker failed: {}", e)))?
    }

    pub async fn initial_setup(&self) -> Result<(), StoreError> {
        self.run(|store| store.initial_setup()).await
    }

    pub async fn get_all_shows(&self) -> Result<Vec<String>, StoreError> {
        self.run(|store| store.get_all_shows()).await
    }

    pub async fn get_show_id_by_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
        let name = name.to_string();
        self.run(move |store| store.get_show_id_by_name(&name)).await
    }

    pub async fn get_episodes_by_show_name(
        &self,
        name: &str,
    ) -> Result<Option<Vec<PathBuf>>, StoreError> {
        let name = name.to_string();
        self.run(move |store| store.get_episodes_by_show_name(&name))
            .await
    }

    pub async fn get_all_episodes(&self) -> Result<Vec<PathBuf>, StoreError> {
        self.run(|store| store.get_all_episodes()).await
    }

    pub async fn get_all(&self) -> Result<Snapshot, StoreError> {
        self.run(|store| store.get_all()).await
    }

    pub async fn get_episode_id(&self, path: &Path) -> Result<Option<i64>, StoreError> {
        let path = path.to_path_buf();
        self.run(move |store| store.get_episode_id(&path)).await
    }

    pub async fn next_episode(
        &self,
        show_name: &str,
        last_watched: Option<&Path>,
    ) -> Result<Option<PathBuf>, StoreError> {
        let show_name = show_name.to_string();
        let last_watched = last_watched.map(Path::to_path_buf);
        self.run(move |store| store.next_episode(&show_name, last_watched.as_deref()))
            .await
    }

    pub async fn add_show(&self, name: &str) -> Result<i64, StoreError> {
        let name = name.to_string();
        self.run(move |store| store.add_show(&name)).await
    }

    pub async fn add_episode_by_show_name(
        &self,
        path: &Path,
        show_name: &str,
    ) -> Result<i64, StoreError> {
        let path = path.to_path_buf();
        let show_name = show_name.to_string();
        self.run(move |store| store.add_episode_by_show_name(&path, &show_name))
            .await
    }

    pub async fn write_all_shows_delta(
        &self,
        snapshot: Arc<Snapshot>,
    ) -> Result<usize, StoreError> {
        self.run(move |store| store.write_all_shows_delta(&snapshot))
            .await
    }

    pub async fn write_all_episodes_delta(
        &self,
        snapshot: Arc<Snapshot>,
    ) -> Result<DeltaSummary, StoreError> {
        self.run(move |store| store.write_all_episodes_delta(&snapshot))
            .await
    }

    pub async fn prune_empty_shows(&self) -> Result<usize, StoreError> {
        self.run(|store| store.prune_empty_shows()).await
    }

    /// Bring the store in line with an observed snapshot: add new shows, then
    /// reconcile every listed show's episodes.
    ///
    /// Concurrent reconciliations are serialized as a whole. Each step is its
    /// own transaction; if the episode step fails, shows added by the first
    /// step remain (shows are additive) and the episode state is unchanged,
    /// so the whole snapshot can be retried.
    ///
    /// Both steps run in one worker that owns the reconciliation lock, so a
    /// cancelled caller never releases the lock while a step is running.
    pub async fn reconcile(&self, snapshot: Snapshot) -> Result<ReconcileSummary, StoreError> {
        let guard = Arc::clone(&self.reconcile_lock).lock_owned().await;

        let summary = self
            .run(move |store| {
                let _guard = guard;
                let shows_added = store.write_all_shows_delta(&snapshot)?;
                let episodes = store.write_all_episodes_delta(&snapshot)?;
                Ok(ReconcileSummary {
                    shows_added,
                    episodes_inserted: episodes.inserted,
                    episodes_deleted: episodes.deleted,
                })
            })
            .await?;
        info!(
            "Library reconciled: {} shows added, {} episodes inserted, {} deleted",
            summary.shows_added, summary.episodes_inserted, summary.episodes_deleted
        );
        Ok(summary)
    }
}

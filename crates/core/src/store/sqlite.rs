//! SQLite-backed episode store implementation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{DeltaSummary, EpisodeStore, Snapshot, StoreError};

/// Schema migrations, applied in order. `PRAGMA user_version` records how
/// many have run.
const MIGRATIONS: &[&str] = &[r#"
    CREATE TABLE IF NOT EXISTS shows (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS episodes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        show_id INTEGER NOT NULL REFERENCES shows(id),
        path TEXT NOT NULL UNIQUE
    );

    CREATE INDEX IF NOT EXISTS idx_episodes_show_id ON episodes(show_id);
    "#];

/// SQLite-backed episode store.
pub struct SqliteEpisodeStore {
    conn: Mutex<Connection>,
}

impl SqliteEpisodeStore {
    /// Open (or create) the database file and make sure the schema is current.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        // Must be set outside a transaction; it is a per-connection setting.
        conn.pragma_update(None, "foreign_keys", true)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initial_setup()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Storage("connection lock poisoned".to_string()))
    }

    fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
        let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        let target = MIGRATIONS.len() as i64;

        if current > target {
            return Err(StoreError::Storage(format!(
                "database schema version {} is newer than supported version {}",
                current, target
            )));
        }
        if current == target {
            return Ok(());
        }

        let tx = conn.transaction()?;
        for (index, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
            debug!("Applying store migration {}", index + 1);
            tx.execute_batch(sql)?;
        }
        tx.pragma_update(None, "user_version", target)?;
        tx.commit()?;

        info!("Episode store schema at version {}", target);
        Ok(())
    }

    fn path_text(path: &Path) -> Result<&str, StoreError> {
        path.to_str()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string_lossy().into_owned()))
    }

    fn show_id(conn: &Connection, name: &str) -> Result<Option<i64>, StoreError> {
        let id = conn
            .query_row(
                "SELECT id FROM shows WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// (id, path) of a show's episodes in insertion order.
    fn load_episodes(conn: &Connection, show_id: i64) -> Result<Vec<(i64, String)>, StoreError> {
        let mut stmt = conn.prepare("SELECT id, path FROM episodes WHERE show_id = ? ORDER BY id")?;
        let rows = stmt.query_map(params![show_id], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut episodes = Vec::new();
        for row in rows {
            episodes.push(row?);
        }
        Ok(episodes)
    }

    fn episodes_by_show_name(
        conn: &Connection,
        name: &str,
    ) -> Result<Option<Vec<PathBuf>>, StoreError> {
        let Some(show_id) = Self::show_id(conn, name)? else {
            return Ok(None);
        };
        let episodes = Self::load_episodes(conn, show_id)?
            .into_iter()
            .map(|(_, path)| PathBuf::from(path))
            .collect();
        Ok(Some(episodes))
    }

    fn insert_show(conn: &Connection, name: &str) -> Result<i64, StoreError> {
        conn.execute("INSERT INTO shows (name) VALUES (?)", params![name])
            .map_err(|e| StoreError::from_sqlite(e, name))?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_episode(conn: &Connection, show_id: i64, path: &str) -> Result<i64, StoreError> {
        conn.execute(
            "INSERT INTO episodes (show_id, path) VALUES (?, ?)",
            params![show_id, path],
        )
        .map_err(|e| StoreError::from_sqlite(e, path))?;
        Ok(conn.last_insert_rowid())
    }
}

impl EpisodeStore for SqliteEpisodeStore {
    fn initial_setup(&self) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        Self::migrate(&mut conn)
    }

    fn get_all_shows(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM shows ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut shows = Vec::new();
        for row in rows {
            shows.push(row?);
        }
        Ok(shows)
    }

    fn get_show_id_by_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
        let conn = self.lock()?;
        Self::show_id(&conn, name)
    }

    fn get_episodes_by_show_name(&self, name: &str) -> Result<Option<Vec<PathBuf>>, StoreError> {
        let conn = self.lock()?;
        Self::episodes_by_show_name(&conn, name)
    }

    fn get_all_episodes(&self) -> Result<Vec<PathBuf>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT e.path FROM episodes e
             JOIN shows s ON s.id = e.show_id
             ORDER BY s.id, e.id",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut episodes = Vec::new();
        for row in rows {
            episodes.push(PathBuf::from(row?));
        }
        Ok(episodes)
    }

    fn get_all(&self) -> Result<Snapshot, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT s.name, e.path FROM shows s
             LEFT JOIN episodes e ON e.show_id = s.id
             ORDER BY s.id, e.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut snapshot = Snapshot::new();
        let mut current: Option<(String, Vec<PathBuf>)> = None;
        for row in rows {
            let (name, path) = row?;
            let path = path.map(PathBuf::from);
            if let Some((show, episodes)) = current.as_mut() {
                if *show == name {
                    episodes.extend(path);
                    continue;
                }
            }
            if let Some((show, episodes)) = current.take() {
                snapshot.push(show, episodes);
            }
            current = Some((name, path.into_iter().collect()));
        }
        if let Some((show, episodes)) = current {
            snapshot.push(show, episodes);
        }
        Ok(snapshot)
    }

    fn get_episode_id(&self, path: &Path) -> Result<Option<i64>, StoreError> {
        let conn = self.lock()?;
        let path = Self::path_text(path)?;
        let id = conn
            .query_row(
                "SELECT id FROM episodes WHERE path = ?",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn next_episode(
        &self,
        show_name: &str,
        last_watched: Option<&Path>,
    ) -> Result<Option<PathBuf>, StoreError> {
        let conn = self.lock()?;
        let Some(episodes) = Self::episodes_by_show_name(&conn, show_name)? else {
            return Ok(None);
        };

        let next = match last_watched {
            None => episodes.into_iter().next(),
            Some(last) => episodes
                .iter()
                .position(|episode| episode == last)
                .and_then(|index| episodes.get(index + 1).cloned()),
        };
        Ok(next)
    }

    fn add_show(&self, name: &str) -> Result<i64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = Self::insert_show(&tx, name)?;
        tx.commit()?;

        debug!("Added show {:?} with id {}", name, id);
        Ok(id)
    }

    fn add_episode_by_show_name(&self, path: &Path, show_name: &str) -> Result<i64, StoreError> {
        let path = Self::path_text(path)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let show_id = Self::show_id(&tx, show_name)?
            .ok_or_else(|| StoreError::UnknownShow(show_name.to_string()))?;
        let id = Self::insert_episode(&tx, show_id, path)?;
        tx.commit()?;

        debug!("Added episode {:?} to show {:?} with id {}", path, show_name, id);
        Ok(id)
    }

    fn write_all_shows_delta(&self, snapshot: &Snapshot) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut added = 0;
        for show in snapshot.shows() {
            if Self::show_id(&tx, show)?.is_none() {
                Self::insert_show(&tx, show)?;
                added += 1;
            }
        }
        tx.commit()?;

        info!(
            "Show delta applied: {} added, {} in snapshot",
            added,
            snapshot.len()
        );
        Ok(added)
    }

    fn write_all_episodes_delta(&self, snapshot: &Snapshot) -> Result<DeltaSummary, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // Resolve every show up front so a missing one fails before any write.
        let mut plan = Vec::with_capacity(snapshot.len());
        for (show, episodes) in snapshot.iter() {
            let show_id =
                Self::show_id(&tx, show)?.ok_or_else(|| StoreError::UnknownShow(show.to_string()))?;

            let mut wanted = Vec::with_capacity(episodes.len());
            let mut listed = HashSet::with_capacity(episodes.len());
            for episode in episodes {
                let path = Self::path_text(episode)?;
                if listed.insert(path) {
                    wanted.push(path);
                }
            }
            plan.push((show_id, wanted, listed));
        }

        // All deletions run before any insertion so a path moving between
        // shows in the same snapshot does not collide with itself.
        let mut summary = DeltaSummary::default();
        let mut inserts = Vec::new();
        for (show_id, wanted, listed) in &plan {
            let mut kept = HashSet::new();
            for (id, path) in Self::load_episodes(&tx, *show_id)? {
                if listed.contains(path.as_str()) {
                    kept.insert(path);
                } else {
                    tx.execute("DELETE FROM episodes WHERE id = ?", params![id])?;
                    summary.deleted += 1;
                }
            }
            for path in wanted {
                if !kept.contains(*path) {
                    inserts.push((*show_id, *path));
                }
            }
        }

        for (show_id, path) in inserts {
            Self::insert_episode(&tx, show_id, path)?;
            summary.inserted += 1;
        }
        tx.commit()?;

        info!(
            "Episode delta applied: {} inserted, {} deleted across {} shows",
            summary.inserted,
            summary.deleted,
            snapshot.len()
        );
        Ok(summary)
    }

    fn prune_empty_shows(&self) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM shows WHERE NOT EXISTS (
                SELECT 1 FROM episodes WHERE episodes.show_id = shows.id
            )",
            [],
        )?;
        tx.commit()?;

        info!("Pruned {} empty shows", removed);
        Ok(removed)
    }
}

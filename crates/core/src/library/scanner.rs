//! File system library scanner.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::str::Chars;

use tokio::fs;
use tracing::{debug, info, warn};

use super::ScanError;
use crate::config::LibraryConfig;
use crate::store::Snapshot;

/// Walks the library root and produces the snapshot fed to reconciliation.
pub struct LibraryScanner {
    config: LibraryConfig,
}

impl LibraryScanner {
    pub fn new(config: LibraryConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Scan the library.
    ///
    /// Shows and episodes are ordered by name using natural ordering. Episode
    /// paths are absolute (the root is canonicalized first).
    pub async fn scan(&self) -> Result<Snapshot, ScanError> {
        let root = self.config.root.as_path();
        match fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(ScanError::RootNotFound {
                    path: root.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScanError::RootNotFound {
                    path: root.to_path_buf(),
                })
            }
            Err(e) => return Err(ScanError::io(root)(e)),
        }
        let root = fs::canonicalize(root).await.map_err(ScanError::io(root))?;

        let mut shows = Vec::new();
        let mut entries = fs::read_dir(&root).await.map_err(ScanError::io(&root))?;
        while let Some(entry) = entries.next_entry().await.map_err(ScanError::io(&root))? {
            let path = entry.path();
            let Some(name) = visible_name(&path) else {
                continue;
            };
            // metadata() follows symlinks, so linked show directories count.
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_dir() => shows.push((name, path)),
                Ok(_) => {}
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        shows.sort_by(|a, b| natural_cmp(&a.0, &b.0));

        let mut snapshot = Snapshot::new();
        for (name, dir) in shows {
            let episodes = self.scan_show(&dir).await?;
            debug!("Scanned show {:?}: {} episodes", name, episodes.len());
            snapshot.push(name, episodes);
        }

        info!(
            "Scanned library {}: {} shows, {} episodes",
            root.display(),
            snapshot.len(),
            snapshot.episode_count()
        );
        Ok(snapshot)
    }

    async fn scan_show(&self, dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(dir).await.map_err(ScanError::io(dir))?;
        while let Some(entry) = entries.next_entry().await.map_err(ScanError::io(dir))? {
            let path = entry.path();
            let Some(name) = visible_name(&path) else {
                continue;
            };
            if !self.is_episode_file(&path) {
                continue;
            }
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => files.push((name, path)),
                Ok(_) => {}
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        files.sort_by(|a, b| natural_cmp(&a.0, &b.0));
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    fn is_episode_file(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.config
            .extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// File name of a non-hidden, UTF-8 named entry.
fn visible_name(path: &Path) -> Option<String> {
    let name = path.file_name()?;
    match name.to_str() {
        Some(name) if name.starts_with('.') => None,
        Some(name) => Some(name.to_string()),
        None => {
            warn!("Skipping non UTF-8 entry {}", path.display());
            None
        }
    }
}

/// Compare names so that digit runs order numerically ("ep 2" < "ep 10").
///
/// Letters compare case-insensitively; names that tie under those rules fall
/// back to plain string order so the result is a total order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        let (l, r) = match (left.peek(), right.peek()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&l), Some(&r)) => (l, r),
        };

        let ord = if l.is_ascii_digit() && r.is_ascii_digit() {
            compare_digit_runs(&take_digits(&mut left), &take_digits(&mut right))
        } else {
            left.next();
            right.next();
            l.to_lowercase().cmp(r.to_lowercase())
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn test_config(root: &Path) -> LibraryConfig {
        LibraryConfig {
            root: root.to_path_buf(),
            ..LibraryConfig::default()
        }
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std_fs::create_dir_all(parent).unwrap();
        }
        std_fs::write(path, b"").unwrap();
    }

    fn file_names(episodes: &[PathBuf]) -> Vec<String> {
        episodes
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_natural_cmp_numbers() {
        assert_eq!(natural_cmp("ep 2", "ep 10"), Ordering::Less);
        assert_eq!(natural_cmp("ep 10", "ep 9"), Ordering::Greater);
        assert_eq!(natural_cmp("ep 010", "ep 9"), Ordering::Greater);
        assert_eq!(natural_cmp("S01E02", "S01E11"), Ordering::Less);
    }

    #[test]
    fn test_natural_cmp_text() {
        assert_eq!(natural_cmp("abc", "abd"), Ordering::Less);
        assert_eq!(natural_cmp("Abc", "abd"), Ordering::Less);
        assert_eq!(natural_cmp("ep", "ep 1"), Ordering::Less);
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
        // Ties under natural rules still order deterministically.
        assert_ne!(natural_cmp("ep 01", "ep 1"), Ordering::Equal);
    }

    #[test]
    fn test_natural_sort() {
        let mut names = vec!["ep 10.mkv", "ep 1.mkv", "ep 2.mkv", "Ep 3.mkv"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["ep 1.mkv", "ep 2.mkv", "Ep 3.mkv", "ep 10.mkv"]);
    }

    #[tokio::test]
    async fn test_scan_library() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("Show B/ep 10.mkv"));
        touch(&root.join("Show B/ep 2.mkv"));
        touch(&root.join("Show B/ep 1.MP4"));
        touch(&root.join("Show B/notes.txt"));
        touch(&root.join("Show B/.ep 3.mkv"));
        touch(&root.join("Show A/only.webm"));
        touch(&root.join("Show A/extras/bonus.mkv"));
        touch(&root.join("loose file.mkv"));
        std_fs::create_dir_all(root.join("Empty Show")).unwrap();
        std_fs::create_dir_all(root.join(".hidden")).unwrap();

        let scanner = LibraryScanner::new(test_config(root));
        let snapshot = scanner.scan().await.unwrap();

        let shows: Vec<&str> = snapshot.shows().collect();
        assert_eq!(shows, vec!["Empty Show", "Show A", "Show B"]);
        assert_eq!(snapshot.get("Empty Show").unwrap().len(), 0);
        assert_eq!(file_names(snapshot.get("Show A").unwrap()), vec!["only.webm"]);
        assert_eq!(
            file_names(snapshot.get("Show B").unwrap()),
            vec!["ep 1.MP4", "ep 2.mkv", "ep 10.mkv"]
        );
        assert!(snapshot.get("Show B").unwrap().iter().all(|p| p.is_absolute()));
    }

    #[tokio::test]
    async fn test_scan_respects_configured_extensions() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("Show/ep 1.mkv"));
        touch(&temp.path().join("Show/ep 1.ass"));

        let config = LibraryConfig {
            root: temp.path().to_path_buf(),
            extensions: vec![".ASS".to_string()],
        };
        let snapshot = LibraryScanner::new(config).scan().await.unwrap();
        assert_eq!(file_names(snapshot.get("Show").unwrap()), vec!["ep 1.ass"]);
    }

    #[tokio::test]
    async fn test_scan_missing_root() {
        let temp = TempDir::new().unwrap();
        let scanner = LibraryScanner::new(test_config(&temp.path().join("missing")));

        let result = scanner.scan().await;
        assert!(matches!(result, Err(ScanError::RootNotFound { .. })));
    }

    #[test]
    fn test_scan_root_is_a_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("library.mkv");
        touch(&file);

        let scanner = LibraryScanner::new(test_config(&file));
        let result = tokio_test::block_on(scanner.scan());
        assert!(matches!(result, Err(ScanError::RootNotFound { .. })));
    }
}

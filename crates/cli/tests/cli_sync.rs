//! End-to-end tests driving the `episodic` binary against a temporary library.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

struct TestLibrary {
    root: PathBuf,
    config_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestLibrary {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("library");
        std::fs::create_dir_all(&root).unwrap();

        let config_path = temp_dir.path().join("config.toml");
        let config = format!(
            "[database]\npath = '{}'\n\n[library]\nroot = '{}'\n",
            temp_dir.path().join("data/episodic.db").display(),
            root.display()
        );
        std::fs::write(&config_path, config).unwrap();

        Self {
            root,
            config_path,
            _temp_dir: temp_dir,
        }
    }

    fn add_episode(&self, show: &str, file: &str) -> PathBuf {
        let dir = self.root.join(show);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file);
        std::fs::write(&path, b"").unwrap();
        path
    }

    async fn run(&self, args: &[&str]) -> std::process::Output {
        tokio::process::Command::new(env!("CARGO_BIN_EXE_episodic"))
            .args(args)
            .env("EPISODIC_CONFIG", &self.config_path)
            .env("RUST_LOG", "error") // Quiet logs during tests
            .output()
            .await
            .expect("Failed to run episodic")
    }
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap()
}

#[tokio::test]
async fn test_sync_and_list() {
    let library = TestLibrary::new();
    library.add_episode("Show B", "ep 2.mkv");
    library.add_episode("Show B", "ep 1.mkv");
    library.add_episode("Show A", "ep 1.mkv");

    let output = library.run(&["sync"]).await;
    assert!(output.status.success(), "sync failed: {:?}", output);
    assert_eq!(
        stdout(&output),
        "2 shows added, 3 episodes added, 0 episodes removed"
    );

    let output = library.run(&["list", "--json"]).await;
    assert!(output.status.success());
    let text = stdout(&output);
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["Show A"].as_array().unwrap().len(), 1);
    assert_eq!(json["Show B"].as_array().unwrap().len(), 2);
    // Shows are listed in discovery order.
    assert!(text.find("Show A").unwrap() < text.find("Show B").unwrap());
}

#[tokio::test]
async fn test_resync_removes_deleted_episodes() {
    let library = TestLibrary::new();
    library.add_episode("Show", "ep 1.mkv");
    let second = library.add_episode("Show", "ep 2.mkv");

    assert!(library.run(&["sync"]).await.status.success());

    std::fs::remove_file(&second).unwrap();
    let output = library.run(&["sync"]).await;
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "0 shows added, 0 episodes added, 1 episodes removed"
    );

    let output = library.run(&["sync"]).await;
    assert_eq!(
        stdout(&output),
        "0 shows added, 0 episodes added, 0 episodes removed"
    );
}

#[tokio::test]
async fn test_next_episode() {
    let library = TestLibrary::new();
    let first = library.add_episode("Show", "ep 1.mkv");
    let second = library.add_episode("Show", "ep 2.mkv");
    assert!(library.run(&["sync"]).await.status.success());

    let output = library.run(&["next", "Show"]).await;
    assert_eq!(PathBuf::from(stdout(&output)), canonical(&first));

    let after = canonical(&first);
    let output = library
        .run(&["next", "Show", "--after", after.to_str().unwrap()])
        .await;
    assert_eq!(PathBuf::from(stdout(&output)), canonical(&second));

    let output = library.run(&["next", "Missing"]).await;
    assert!(!output.status.success());
}

#[tokio::test]
async fn test_prune_after_show_directory_empties() {
    let library = TestLibrary::new();
    let episode = library.add_episode("Show", "ep 1.mkv");
    library.add_episode("Other", "ep 1.mkv");
    assert!(library.run(&["sync"]).await.status.success());

    std::fs::remove_file(&episode).unwrap();
    assert!(library.run(&["sync"]).await.status.success());

    let output = library.run(&["prune"]).await;
    assert_eq!(stdout(&output), "1 empty shows removed");

    let output = library.run(&["list"]).await;
    let text = stdout(&output);
    assert!(text.contains("Other (1 episodes)"));
    assert!(!text.contains("Show ("));
}

#[tokio::test]
async fn test_missing_config_file_fails() {
    let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_episodic"))
        .args(["--config", "/nonexistent/config.toml", "list"])
        .env("RUST_LOG", "error")
        .output()
        .await
        .expect("Failed to run episodic");
    assert!(!output.status.success());
}

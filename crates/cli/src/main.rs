use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use episodic_core::{
    default_config_path, load_config, load_config_or_default, validate_config, Config,
    LibraryScanner, SqliteEpisodeStore, StoreHandle,
};

/// Environment variable naming the config file
const CONFIG_ENV: &str = "EPISODIC_CONFIG";

#[derive(Debug, Parser)]
#[command(name = "episodic", version, about = "Track the shows and episodes in a local anime library")]
struct Cli {
    /// Config file (overrides EPISODIC_CONFIG and the platform default)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan the library and reconcile the store with what is on disk
    Sync,
    /// Print every show and its episodes
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the episode to watch next
    Next {
        /// Show name
        show: String,
        /// Last watched episode path
        #[arg(long)]
        after: Option<PathBuf>,
    },
    /// Remove shows that no longer have episodes
    Prune,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = resolve_config(cli.config)?;
    validate_config(&config).context("Configuration validation failed")?;
    info!("Database path: {:?}", config.database.path);

    let store = open_store(&config.database.path)?;
    let handle = StoreHandle::new(Arc::new(store), config.workers.max_concurrent);
    info!("Episode store initialized");

    match cli.command {
        Command::Sync => {
            let scanner = LibraryScanner::new(config.library.clone());
            let snapshot = scanner
                .scan()
                .await
                .with_context(|| format!("Failed to scan library {:?}", scanner.root()))?;
            let summary = handle
                .reconcile(snapshot)
                .await
                .context("Failed to reconcile library")?;
            println!(
                "{} shows added, {} episodes added, {} episodes removed",
                summary.shows_added, summary.episodes_inserted, summary.episodes_deleted
            );
        }
        Command::List { json } => {
            let all = handle.get_all().await.context("Failed to read store")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else {
                for (show, episodes) in all.iter() {
                    println!("{} ({} episodes)", show, episodes.len());
                    for episode in episodes {
                        println!("  {}", episode.display());
                    }
                }
            }
        }
        Command::Next { show, after } => {
            match handle.next_episode(&show, after.as_deref()).await? {
                Some(path) => println!("{}", path.display()),
                None if handle.get_show_id_by_name(&show).await?.is_none() => {
                    bail!("Unknown show: {}", show)
                }
                None => println!("No next episode for {}", show),
            }
        }
        Command::Prune => {
            let removed = handle.prune_empty_shows().await?;
            println!("{} empty shows removed", removed);
        }
    }

    Ok(())
}

/// An explicitly named config file must exist; the platform default may not.
fn resolve_config(explicit: Option<PathBuf>) -> Result<Config> {
    let explicit = explicit.or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));

    if let Some(path) = explicit {
        info!("Loading configuration from {:?}", path);
        return load_config(&path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }

    let path = default_config_path().unwrap_or_else(|| PathBuf::from("config.toml"));
    info!("Loading configuration from {:?} (defaults if absent)", path);
    load_config_or_default(&path).with_context(|| format!("Failed to load config from {:?}", path))
}

fn open_store(path: &Path) -> Result<SqliteEpisodeStore> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {:?}", parent))?;
    }

    SqliteEpisodeStore::new(path)
        .with_context(|| format!("Failed to open episode store at {:?}", path))
}

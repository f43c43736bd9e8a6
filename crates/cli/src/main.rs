//! clanctl entry point.
//!
//! Opens the store, runs one command through the clan runtime and prints the
//! result as JSON. Webhooks raised by the command are delivered before exit.
mod args;
mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use clan_runtime::{ClanRuntime, EntityStore, InMemoryStore, RuntimeConfig, SqliteStore};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = RuntimeConfig::from_env();
    if cli.no_hooks {
        config.dispatch_hooks = false;
    }

    let log_dir = config.log_dir.clone().unwrap_or_else(default_log_dir);
    let _guard = setup_logging(&log_dir)?;

    if cli.in_memory {
        tracing::info!("Using in-memory store");
        return run(InMemoryStore::new(), config, cli).await;
    }

    let path = cli
        .database
        .clone()
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(default_database_path);
    tracing::info!("Using SQLite store at {}", path.display());
    let store = SqliteStore::open(&path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    config.database_path = Some(path);
    run(store, config, cli).await
}

async fn run<S: EntityStore + 'static>(store: S, config: RuntimeConfig, cli: Cli) -> Result<()> {
    let runtime = ClanRuntime::builder(store).config(config).build().await?;

    let outcome = commands::execute(runtime.service(), cli.command);
    runtime.shutdown().await?;

    let output = outcome?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Setup logging to a file so stdout stays machine-readable
fn setup_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, "clanctl.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    tracing::debug!("Log file: {}/clanctl.log", log_dir.display());
    Ok(guard)
}

/// Platform cache directory, e.g. `~/.cache/clan/logs` on Linux.
fn default_log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "clan")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/clan"))
        .join("logs")
}

/// Platform data directory, e.g. `~/.local/share/clan/clans.db` on Linux.
fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "clan")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./clan_data"))
        .join("clans.db")
}

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pharmasync_core::SyncConfig;
use pharmasync_remote::{RemoteBackend, RestClient};
use pharmasync_service::{Connectivity, EVENT_CHANNEL_CAPACITY, SyncManager};
use pharmasync_storage::Storage;
use pharmasync_storage::traits::PendingActionStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pharmasync")]
#[command(about = "Offline sync queue for pharmacy inventory counts", long_about = None)]
struct Cli {
    /// Queue database file (overrides PHARMASYNC_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the inspection API with the sync manager
    Serve {
        #[arg(short, long, default_value = "37780")]
        port: u16,
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Start offline; nothing is sent until connectivity is reported
        #[arg(long)]
        offline: bool,
    },
    /// List queued actions
    Queue {
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },
    /// Queue counts by status
    Stats,
    /// Run one drain pass against the backend
    Drain,
    /// Delete actions that exhausted their retries
    ClearFailed,
}

fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Storage, REST client and sync manager wired from `config`.
fn build_sync_manager(config: &SyncConfig, online: bool) -> Result<Arc<SyncManager>> {
    ensure_db_dir(&config.db_path)?;
    let storage = Storage::new(&config.db_path, config.db_pool_size)?;
    if config.api_key.is_empty() {
        tracing::warn!("PHARMASYNC_API_KEY is not set, backend requests are unauthenticated");
    }
    let remote = RestClient::new(&config.backend_url, config.api_key.clone(), config.request_timeout)?;
    let store: Arc<dyn PendingActionStore> = Arc::new(storage);
    let remote: Arc<dyn RemoteBackend> = Arc::new(remote);
    let (event_tx, _initial_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    Ok(Arc::new(SyncManager::new(
        store,
        remote,
        Connectivity::new(online),
        config,
        event_tx,
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = SyncConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command {
        Commands::Serve { port, host, offline } => {
            commands::serve::run(port, host, offline, config).await?;
        },
        Commands::Queue { limit } => commands::queue::run_list(&config, limit).await?,
        Commands::Stats => commands::queue::run_stats(&config).await?,
        Commands::Drain => commands::queue::run_drain(&config).await?,
        Commands::ClearFailed => commands::queue::run_clear_failed(&config).await?,
    }

    Ok(())
}

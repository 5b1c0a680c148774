use anyhow::Result;
use pharmasync_core::SyncConfig;
use pharmasync_http::{AppState, create_router};
use pharmasync_service::{PreCountService, QueueService};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::build_sync_manager;

const REALTIME_CHANNEL_CAPACITY: usize = 256;

pub(crate) async fn run(port: u16, host: String, offline: bool, config: SyncConfig) -> Result<()> {
    let sync = build_sync_manager(&config, !offline)?;
    let queue_service = Arc::new(QueueService::new(Arc::clone(&sync)));
    if let Err(e) = queue_service.recover_interrupted().await {
        tracing::warn!("Startup recovery failed: {}", e);
    }

    let pre_count = Arc::new(PreCountService::new(Arc::clone(&sync), config.undo_window));
    let (realtime_tx, realtime_rx) = mpsc::channel(REALTIME_CHANNEL_CAPACITY);
    drop(pre_count.spawn_realtime_listener(realtime_rx));
    drop(sync.spawn_reconnect_listener());

    if offline {
        tracing::info!("Starting offline, queue will drain once connectivity is reported");
    } else {
        match sync.drain().await {
            Ok(report) if report.attempted > 0 => {
                tracing::info!(succeeded = report.succeeded, "Startup drain finished");
            },
            Ok(_) => {},
            Err(e) => tracing::warn!("Startup drain failed: {}", e),
        }
    }

    let state = Arc::new(AppState { sync, queue_service, pre_count, realtime_tx });
    let router = create_router(state);
    let addr = format!("{host}:{port}");
    tracing::info!(backend = %config.backend_url, "Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

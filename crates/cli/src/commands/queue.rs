use anyhow::Result;
use pharmasync_core::SyncConfig;
use pharmasync_service::QueueService;

use crate::build_sync_manager;

fn queue_service(config: &SyncConfig, online: bool) -> Result<QueueService> {
    Ok(QueueService::new(build_sync_manager(config, online)?))
}

pub(crate) async fn run_list(config: &SyncConfig, limit: usize) -> Result<()> {
    let snapshot = queue_service(config, false)?.snapshot(limit).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub(crate) async fn run_stats(config: &SyncConfig) -> Result<()> {
    let stats = queue_service(config, false)?.stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

pub(crate) async fn run_drain(config: &SyncConfig) -> Result<()> {
    let service = queue_service(config, true)?;
    service.recover_interrupted().await?;
    let report = service.force_drain().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) async fn run_clear_failed(config: &SyncConfig) -> Result<()> {
    let cleared = queue_service(config, false)?.clear_failed().await?;
    println!("{}", serde_json::json!({ "cleared": cleared }));
    Ok(())
}

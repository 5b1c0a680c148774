use std::sync::Arc;

use pharmasync_core::constants::MAX_QUERY_LIMIT;
use pharmasync_core::{PendingAction, QueueStats};
use serde::Serialize;

use crate::events::DrainReport;
use crate::{ServiceError, SyncManager};

/// Queue contents plus counts, as shown by the inspection view.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub actions: Vec<PendingAction>,
    pub stats: QueueStats,
}

/// Read-only view over the queue plus the force-drain entry point.
pub struct QueueService {
    sync: Arc<SyncManager>,
}

impl QueueService {
    #[must_use]
    pub fn new(sync: Arc<SyncManager>) -> Self {
        Self { sync }
    }

    pub async fn snapshot(&self, limit: usize) -> Result<QueueSnapshot, ServiceError> {
        let store = self.sync.store();
        let actions = store.list_all(limit.min(MAX_QUERY_LIMIT)).await?;
        let stats = store.stats().await?;
        Ok(QueueSnapshot { actions, stats })
    }

    pub async fn stats(&self) -> Result<QueueStats, ServiceError> {
        Ok(self.sync.store().stats().await?)
    }

    pub async fn get(&self, id: i64) -> Result<PendingAction, ServiceError> {
        self.sync
            .store()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("pending action {id}")))
    }

    pub async fn force_drain(&self) -> Result<DrainReport, ServiceError> {
        tracing::info!("Manual drain requested");
        self.sync.drain().await
    }

    pub async fn clear_failed(&self) -> Result<usize, ServiceError> {
        let cleared = self.sync.store().clear_failed().await?;
        if cleared > 0 {
            tracing::info!(cleared, "Cleared failed actions");
        }
        Ok(cleared)
    }

    /// Put records left `syncing` by an interrupted process back to `pending`.
    pub async fn recover_interrupted(&self) -> Result<usize, ServiceError> {
        let released = self.sync.store().release_syncing().await?;
        if released > 0 {
            tracing::info!(released, "Startup recovery: released interrupted actions back to pending");
        }
        Ok(released)
    }
}

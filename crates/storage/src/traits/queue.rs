use async_trait::async_trait;
use pharmasync_core::{ActionPatch, ActionPayload, PendingAction, QueueStats};

use crate::error::StorageError;

/// Pending action queue operations.
#[async_trait]
pub trait PendingActionStore: Send + Sync {
    /// Append a `pending` action with `retries = 0` and `timestamp = now`.
    async fn enqueue(&self, payload: &ActionPayload) -> Result<PendingAction, StorageError>;

    /// Pending and failed actions, oldest first.
    async fn list_pending(&self) -> Result<Vec<PendingAction>, StorageError>;

    /// Merge status, retries and error into an action.
    async fn update_status(&self, id: i64, patch: &ActionPatch) -> Result<(), StorageError>;

    /// Delete an action. Returns whether it existed.
    async fn remove(&self, id: i64) -> Result<bool, StorageError>;

    /// Fetch a single action.
    async fn get(&self, id: i64) -> Result<Option<PendingAction>, StorageError>;

    /// Every action regardless of status, oldest first.
    async fn list_all(&self, limit: usize) -> Result<Vec<PendingAction>, StorageError>;

    /// Counts by status.
    async fn stats(&self) -> Result<QueueStats, StorageError>;

    /// Put actions stuck in `syncing` back to `pending`.
    async fn release_syncing(&self) -> Result<usize, StorageError>;

    /// Drop every `failed` action.
    async fn clear_failed(&self) -> Result<usize, StorageError>;
}

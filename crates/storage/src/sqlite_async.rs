//! Async trait implementation for SQLite `Storage` via `spawn_blocking`.

use async_trait::async_trait;
use pharmasync_core::{ActionPatch, ActionPayload, PendingAction, QueueStats};

use crate::error::StorageError;
use crate::traits::PendingActionStore;
use crate::Storage;

/// Helper: run a blocking closure on the tokio blocking pool.
async fn blocking<F, T>(f: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Join(e.to_string()))?
}

/// Body-generating macro for async-to-blocking delegation.
///
/// Each argument is annotated with a capture kind:
/// - `@ref arg`      — `.clone()` a `&T`, pass as `&arg`
/// - `@val arg`      — move directly (Copy/owned types)
macro_rules! delegate {
    ($self:ident, $method:ident $(, @$kind:ident $arg:ident)*) => {{
        let s = $self.clone();
        $(delegate!(@capture $kind $arg);)*
        blocking(move || s.$method($(delegate!(@pass $kind $arg)),*)).await
    }};
    (@capture ref $arg:ident) => { let $arg = $arg.clone(); };
    (@capture val $arg:ident) => { };
    (@pass ref $arg:ident) => { &$arg };
    (@pass val $arg:ident) => { $arg };
}

#[async_trait]
impl PendingActionStore for Storage {
    async fn enqueue(&self, payload: &ActionPayload) -> Result<PendingAction, StorageError> {
        delegate!(self, enqueue_action, @ref payload)
    }
    async fn list_pending(&self) -> Result<Vec<PendingAction>, StorageError> {
        delegate!(self, list_pending_actions)
    }
    async fn update_status(&self, id: i64, patch: &ActionPatch) -> Result<(), StorageError> {
        delegate!(self, update_action_status, @val id, @ref patch)
    }
    async fn remove(&self, id: i64) -> Result<bool, StorageError> {
        delegate!(self, remove_action, @val id)
    }
    async fn get(&self, id: i64) -> Result<Option<PendingAction>, StorageError> {
        delegate!(self, get_action, @val id)
    }
    async fn list_all(&self, limit: usize) -> Result<Vec<PendingAction>, StorageError> {
        delegate!(self, list_actions, @val limit)
    }
    async fn stats(&self) -> Result<QueueStats, StorageError> {
        delegate!(self, queue_stats)
    }
    async fn release_syncing(&self) -> Result<usize, StorageError> {
        delegate!(self, release_syncing_actions)
    }
    async fn clear_failed(&self) -> Result<usize, StorageError> {
        delegate!(self, clear_failed_actions)
    }
}

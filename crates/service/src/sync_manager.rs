//! Drains the durable queue against the remote backend.
//!
//! One pass at a time, records strictly oldest first. A pass only runs when
//! online; it is requested after every enqueue and whenever connectivity
//! comes back, never on a timer. Once a record for a target fails in a pass,
//! later records for that target wait, so a newer write never lands before
//! an older one.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pharmasync_core::{
    ActionPatch, ActionPayload, ActionStatus, PendingAction, RetryPolicy, SyncConfig,
};
use pharmasync_remote::{RemoteBackend, RemoteError};
use pharmasync_storage::traits::PendingActionStore;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::connectivity::Connectivity;
use crate::events::{DrainReport, SkipReason, SyncEvent};
use crate::ServiceError;

/// Capacity of the shared event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Clears the in-progress flag on every exit path of a pass.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

enum Resolution {
    Synced,
    Retrying,
    Failed,
}

/// Where a submitted action stands once the inline drain is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    /// Executed remotely and removed from the queue.
    Sent,
    /// Still queued: offline, deferred behind an older record, or another
    /// pass was running.
    Queued,
    /// The inline attempt failed; the record was withdrawn from the queue.
    Rejected(String),
}

pub struct SyncManager {
    store: Arc<dyn PendingActionStore>,
    remote: Arc<dyn RemoteBackend>,
    connectivity: Connectivity,
    max_retries: u32,
    retry_policy: RetryPolicy,
    draining: AtomicBool,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl SyncManager {
    #[must_use]
    pub fn new(
        store: Arc<dyn PendingActionStore>,
        remote: Arc<dyn RemoteBackend>,
        connectivity: Connectivity,
        config: &SyncConfig,
        event_tx: broadcast::Sender<SyncEvent>,
    ) -> Self {
        Self {
            store,
            remote,
            connectivity,
            max_retries: config.max_retries.max(1),
            retry_policy: config.retry_policy,
            draining: AtomicBool::new(false),
            event_tx,
        }
    }

    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    #[must_use]
    pub fn remote(&self) -> &Arc<dyn RemoteBackend> {
        &self.remote
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn PendingActionStore> {
        &self.store
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub fn event_sender(&self) -> broadcast::Sender<SyncEvent> {
        self.event_tx.clone()
    }

    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn publish(&self, event: SyncEvent) {
        // No subscribers is normal outside `serve`.
        let _ = self.event_tx.send(event);
    }

    /// Flip the connectivity flag. Returns whether it changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.connectivity.set_online(online);
        if changed {
            tracing::info!(online, "Connectivity changed");
            self.publish(SyncEvent::Connectivity { online });
        }
        changed
    }

    /// Persist `payload` and, when online, drain right away.
    ///
    /// The drain result is logged, not returned: the record is durable either way.
    pub async fn enqueue(&self, payload: ActionPayload) -> Result<PendingAction, ServiceError> {
        let action = self.store.enqueue(&payload).await?;
        tracing::debug!(
            id = action.id,
            action_type = %action.action_type,
            entity = %action.entity,
            target = %payload.target(),
            "Action enqueued"
        );
        self.publish(SyncEvent::Enqueued {
            id: action.id,
            action_type: action.action_type,
            entity: action.entity,
            target: payload.target(),
        });

        if self.connectivity.is_online() {
            if let Err(e) = self.drain().await {
                tracing::warn!(error = %e, "Drain after enqueue failed");
            }
        }
        Ok(action)
    }

    /// Enqueue `payload` and report what the inline drain did with it.
    ///
    /// A record that was attempted and failed is withdrawn so the caller can
    /// roll its optimistic state back without a later replay resurrecting it.
    pub async fn submit(&self, payload: ActionPayload) -> Result<Submitted, ServiceError> {
        let action = self.enqueue(payload).await?;
        let Some(stored) = self.store.get(action.id).await? else {
            return Ok(Submitted::Sent);
        };
        if stored.status == ActionStatus::Syncing || stored.retries == 0 {
            return Ok(Submitted::Queued);
        }
        if !self.store.remove(action.id).await? {
            // Another pass confirmed it between the drain and the removal.
            return Ok(Submitted::Sent);
        }
        tracing::debug!(id = action.id, "Withdrew rejected action");
        Ok(Submitted::Rejected(stored.error.unwrap_or_default()))
    }

    /// Run one pass over pending and failed records.
    ///
    /// Returns a skipped report when offline or when another pass holds the guard.
    /// Storage errors on a single record are logged and counted; only a
    /// failure to list the queue aborts the pass.
    pub async fn drain(&self) -> Result<DrainReport, ServiceError> {
        if !self.connectivity.is_online() {
            tracing::debug!("Drain skipped: offline");
            return Ok(DrainReport::skipped(SkipReason::Offline));
        }
        if self.draining.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err()
        {
            tracing::debug!("Drain skipped: already running");
            return Ok(DrainReport::skipped(SkipReason::AlreadyRunning));
        }
        let _guard = DrainGuard(&self.draining);

        let actions = self.store.list_pending().await?;
        let mut report = DrainReport::completed();
        if !actions.is_empty() {
            tracing::info!(count = actions.len(), "Draining sync queue");
        }

        let mut blocked: HashSet<String> = HashSet::new();
        for action in actions {
            if !self.connectivity.is_online() {
                tracing::info!("Went offline mid-drain, stopping");
                break;
            }
            let key = format!("{}:{}", action.entity, action.payload.target());
            if blocked.contains(&key) {
                tracing::debug!(id = action.id, target = %key, "Earlier action for target did not sync, deferring");
                report.deferred = report.deferred.saturating_add(1);
                continue;
            }
            report.attempted = report.attempted.saturating_add(1);
            match self.process(&action).await {
                Ok(Resolution::Synced) => report.succeeded = report.succeeded.saturating_add(1),
                Ok(Resolution::Retrying) => {
                    report.retried = report.retried.saturating_add(1);
                    blocked.insert(key);
                },
                Ok(Resolution::Failed) => {
                    report.failed = report.failed.saturating_add(1);
                    blocked.insert(key);
                },
                Err(e) => {
                    tracing::error!(id = action.id, error = %e, "Queue update failed mid-drain, releasing action");
                    self.release(action.id).await;
                    report.errored = report.errored.saturating_add(1);
                    blocked.insert(key);
                },
            }
        }

        if report.attempted > 0 {
            tracing::info!(
                attempted = report.attempted,
                succeeded = report.succeeded,
                retried = report.retried,
                failed = report.failed,
                deferred = report.deferred,
                errored = report.errored,
                "Drain finished"
            );
        }
        self.publish(SyncEvent::DrainFinished { report });
        Ok(report)
    }

    async fn release(&self, id: i64) {
        if let Err(e) = self.store.update_status(id, &ActionPatch::released()).await {
            tracing::error!(id, error = %e, "Could not release action; startup recovery will");
        }
    }

    async fn process(&self, action: &PendingAction) -> Result<Resolution, ServiceError> {
        self.store.update_status(action.id, &ActionPatch::syncing()).await?;
        self.publish(SyncEvent::Syncing { id: action.id });

        match self.remote.execute(&action.payload).await {
            Ok(()) => {
                self.store.remove(action.id).await?;
                tracing::debug!(id = action.id, target = %action.payload.target(), "Action synced");
                self.publish(SyncEvent::Synced { id: action.id });
                Ok(Resolution::Synced)
            },
            Err(e) => self.record_failure(action, &e).await,
        }
    }

    async fn record_failure(
        &self,
        action: &PendingAction,
        err: &RemoteError,
    ) -> Result<Resolution, ServiceError> {
        let retries = action.retries.saturating_add(1);
        let error = err.to_string();
        let give_up = retries >= self.max_retries
            || (self.retry_policy == RetryPolicy::Classified && err.is_permanent());

        if give_up {
            self.store.update_status(action.id, &ActionPatch::failed(retries, error.clone())).await?;
            tracing::warn!(id = action.id, retries, error = %error, "Action failed permanently");
            self.publish(SyncEvent::Failed { id: action.id, retries, error });
            Ok(Resolution::Failed)
        } else {
            self.store.update_status(action.id, &ActionPatch::retry(retries, error.clone())).await?;
            tracing::warn!(
                id = action.id,
                retries,
                max_retries = self.max_retries,
                error = %error,
                "Action failed, will retry on next drain"
            );
            self.publish(SyncEvent::Retrying { id: action.id, retries, error });
            Ok(Resolution::Retrying)
        }
    }

    /// Drain whenever the connectivity flag changes and reads online.
    ///
    /// Quick offline→online flips can reach the receiver as a single change,
    /// so the new value alone decides; the drain guard absorbs repeats.
    pub fn spawn_reconnect_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut rx = manager.connectivity.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online {
                    tracing::info!("Back online, draining sync queue");
                    if let Err(e) = manager.drain().await {
                        tracing::error!(error = %e, "Drain after reconnect failed");
                    }
                }
            }
        })
    }
}

#![allow(clippy::unwrap_used, reason = "test code")]

mod pre_count_tests;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pharmasync_core::{ActionPatch, ActionPayload, PendingAction, QueueStats, RemoteItem, SyncConfig};
use pharmasync_remote::{RemoteBackend, RemoteError};
use pharmasync_storage::traits::PendingActionStore;
use pharmasync_storage::{Storage, StorageError};
use tokio::sync::{Notify, broadcast};

use crate::{Connectivity, EVENT_CHANNEL_CAPACITY, SyncEvent, SyncManager};

/// Pauses the first remote call until released.
pub(crate) struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// In-memory stand-in for the hosted `pre_count_items` table.
#[derive(Default)]
pub(crate) struct MockBackend {
    rows: Mutex<HashMap<(String, String), RemoteItem>>,
    calls: Mutex<Vec<ActionPayload>>,
    fail_status: Mutex<Option<u16>>,
    /// Only calls for this target fail, with a 503.
    fail_target: Mutex<Option<String>>,
    /// Calls that apply their effect but still report a timeout.
    apply_then_fail: AtomicUsize,
    gate: Mutex<Option<Arc<Gate>>>,
    next_id: AtomicUsize,
}

impl MockBackend {
    pub(crate) fn fail_with(&self, status: Option<u16>) {
        *self.fail_status.lock().unwrap() = status;
    }

    pub(crate) fn fail_target(&self, target: Option<&str>) {
        *self.fail_target.lock().unwrap() = target.map(str::to_owned);
    }

    pub(crate) fn apply_then_fail(&self, times: usize) {
        self.apply_then_fail.store(times, Ordering::SeqCst);
    }

    pub(crate) fn install_gate(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate { entered: Notify::new(), release: Notify::new() });
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub(crate) fn calls(&self) -> Vec<ActionPayload> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn rows(&self) -> Vec<RemoteItem> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn row(&self, session_id: &str, ean: &str) -> Option<RemoteItem> {
        self.rows.lock().unwrap().get(&(session_id.to_owned(), ean.to_owned())).cloned()
    }

    pub(crate) fn seed(&self, session_id: &str, ean: &str, quantity: i64) -> RemoteItem {
        let row = RemoteItem {
            id: format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            session_id: session_id.to_owned(),
            ean: ean.to_owned(),
            product_name: None,
            quantity,
        };
        self.rows.lock().unwrap().insert((session_id.to_owned(), ean.to_owned()), row.clone());
        row
    }

    fn apply(&self, payload: &ActionPayload) {
        match payload {
            ActionPayload::CreateItem(item) | ActionPayload::UpdateItem(item) => {
                let mut rows = self.rows.lock().unwrap();
                let key = (item.session_id.clone(), item.ean.clone());
                let id = rows.get(&key).map(|row| row.id.clone()).unwrap_or_else(|| {
                    format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
                });
                rows.insert(
                    key,
                    RemoteItem {
                        id,
                        session_id: item.session_id.clone(),
                        ean: item.ean.clone(),
                        product_name: item.product_name.clone(),
                        quantity: item.quantity,
                    },
                );
            },
            ActionPayload::DeleteItem { session_id, ean } => {
                self.rows.lock().unwrap().remove(&(session_id.clone(), ean.clone()));
            },
            _ => {},
        }
    }
}

#[async_trait]
impl RemoteBackend for MockBackend {
    async fn execute(&self, payload: &ActionPayload) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(payload.clone());

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        if let Some(code) = *self.fail_status.lock().unwrap() {
            return Err(RemoteError::HttpStatus { code, body: "mock failure".to_owned() });
        }
        if self.fail_target.lock().unwrap().as_deref() == Some(payload.target().as_str()) {
            return Err(RemoteError::HttpStatus { code: 503, body: "target unavailable".to_owned() });
        }
        self.apply(payload);
        let remaining = self.apply_then_fail.load(Ordering::SeqCst);
        if remaining > 0 {
            self.apply_then_fail.store(remaining - 1, Ordering::SeqCst);
            return Err(RemoteError::HttpStatus { code: 504, body: "gateway timeout".to_owned() });
        }
        Ok(())
    }

    async fn fetch_items(&self, session_id: &str) -> Result<Vec<RemoteItem>, RemoteError> {
        if let Some(code) = *self.fail_status.lock().unwrap() {
            return Err(RemoteError::HttpStatus { code, body: "mock failure".to_owned() });
        }
        let mut rows: Vec<RemoteItem> =
            self.rows().into_iter().filter(|row| row.session_id == session_id).collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows)
    }
}

pub(crate) struct Harness {
    pub sync: Arc<SyncManager>,
    pub backend: Arc<MockBackend>,
    _dir: tempfile::TempDir,
}

pub(crate) fn harness(online: bool) -> Harness {
    harness_with(online, &SyncConfig::default())
}

pub(crate) fn harness_with(online: bool, config: &SyncConfig) -> Harness {
    build_harness(online, config, |storage| Arc::new(storage) as Arc<dyn PendingActionStore>)
}

/// Harness whose store fails the first `failing_removes` removals.
pub(crate) fn flaky_harness(online: bool, failing_removes: usize) -> Harness {
    build_harness(online, &SyncConfig::default(), |inner| {
        let store = FlakyStore { inner, failing_removes: AtomicUsize::new(failing_removes) };
        Arc::new(store) as Arc<dyn PendingActionStore>
    })
}

fn build_harness(
    online: bool,
    config: &SyncConfig,
    wrap: impl FnOnce(Storage) -> Arc<dyn PendingActionStore>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(&dir.path().join("queue.db"), 2).unwrap();
    let backend = Arc::new(MockBackend::default());
    let remote: Arc<dyn RemoteBackend> = backend.clone();
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let sync = Arc::new(SyncManager::new(
        wrap(storage),
        remote,
        Connectivity::new(online),
        config,
        event_tx,
    ));
    Harness { sync, backend, _dir: dir }
}

/// Queue store whose `remove` breaks a set number of times.
struct FlakyStore {
    inner: Storage,
    failing_removes: AtomicUsize,
}

#[async_trait]
impl PendingActionStore for FlakyStore {
    async fn enqueue(&self, payload: &ActionPayload) -> Result<PendingAction, StorageError> {
        self.inner.enqueue(payload).await
    }
    async fn list_pending(&self) -> Result<Vec<PendingAction>, StorageError> {
        self.inner.list_pending().await
    }
    async fn update_status(&self, id: i64, patch: &ActionPatch) -> Result<(), StorageError> {
        self.inner.update_status(id, patch).await
    }
    async fn remove(&self, id: i64) -> Result<bool, StorageError> {
        let left = self.failing_removes.load(Ordering::SeqCst);
        if left > 0 {
            self.failing_removes.store(left - 1, Ordering::SeqCst);
            return Err(StorageError::Join("disk busy".to_owned()));
        }
        self.inner.remove(id).await
    }
    async fn get(&self, id: i64) -> Result<Option<PendingAction>, StorageError> {
        self.inner.get(id).await
    }
    async fn list_all(&self, limit: usize) -> Result<Vec<PendingAction>, StorageError> {
        self.inner.list_all(limit).await
    }
    async fn stats(&self) -> Result<QueueStats, StorageError> {
        self.inner.stats().await
    }
    async fn release_syncing(&self) -> Result<usize, StorageError> {
        self.inner.release_syncing().await
    }
    async fn clear_failed(&self) -> Result<usize, StorageError> {
        self.inner.clear_failed().await
    }
}

/// Everything currently buffered on an event receiver.
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

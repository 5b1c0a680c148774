//! Optimistic pre-count lists.
//!
//! Every mutation lands in the in-memory list first, then goes through the
//! durable queue. Online, the inline drain sends it right away, behind any
//! older record for the same item; if that attempt fails the list is rolled
//! back with one error notification. Otherwise the row stays unconfirmed
//! until a realtime event confirms it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pharmasync_core::{ActionPayload, CountItem, PreCountItem, RealtimeEvent, normalize_ean, reconcile};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::events::{Notification, SyncEvent};
use crate::{ServiceError, Submitted, SyncManager};

/// How a mutation reached (or failed to reach) the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    Queued,
    RolledBack,
}

/// Result of one optimistic mutation: the row as the user now sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemChange {
    pub item: Option<CountItem>,
    pub delivery: Delivery,
}

struct RemovedItem {
    item: CountItem,
    removed_at: Instant,
}

type ItemKey = (String, String);

pub struct PreCountService {
    sync: Arc<SyncManager>,
    undo_window: Duration,
    lists: RwLock<HashMap<String, Vec<CountItem>>>,
    removed: Mutex<HashMap<ItemKey, RemovedItem>>,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl PreCountService {
    #[must_use]
    pub fn new(sync: Arc<SyncManager>, undo_window: Duration) -> Self {
        let event_tx = sync.event_sender();
        Self {
            sync,
            undo_window,
            lists: RwLock::new(HashMap::new()),
            removed: Mutex::new(HashMap::new()),
            event_tx,
        }
    }

    pub async fn items(&self, session_id: &str) -> Vec<CountItem> {
        self.lists.read().await.get(session_id).cloned().unwrap_or_default()
    }

    /// Replace the confirmed rows of a session with the remote snapshot.
    /// Unconfirmed local rows are kept and merged like realtime updates.
    pub async fn load(&self, session_id: &str) -> Result<Vec<CountItem>, ServiceError> {
        let rows = self.sync.remote().fetch_items(session_id).await?;
        let mut lists = self.lists.write().await;
        let local = lists.remove(session_id).unwrap_or_default();
        let mut items: Vec<CountItem> = local.into_iter().filter(|item| !item.synced).collect();
        for record in rows.into_iter().rev() {
            items = reconcile(items, &RealtimeEvent::Update { record });
        }
        tracing::debug!(session_id, count = items.len(), "Pre-count list loaded");
        lists.insert(session_id.to_owned(), items.clone());
        Ok(items)
    }

    /// Scan `quantity` units of `ean`. Scanning an EAN already in the list
    /// increments it instead of adding a second row.
    pub async fn add(
        &self,
        session_id: &str,
        ean: &str,
        product_name: Option<String>,
        quantity: i64,
    ) -> Result<ItemChange, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidInput(format!(
                "scanned quantity must be positive, got {quantity}"
            )));
        }
        let scanned = PreCountItem::new(session_id, ean, product_name, quantity)?;
        Ok(self.create(scanned).await)
    }

    async fn create(&self, scanned: PreCountItem) -> ItemChange {
        let mut lists = self.lists.write().await;
        let items = lists.entry(scanned.session_id.clone()).or_default();
        if let Some(existing) = items.iter_mut().find(|item| item.ean == scanned.ean) {
            let previous = existing.clone();
            existing.quantity = existing.quantity.saturating_add(scanned.quantity);
            existing.synced = false;
            let updated = existing.clone();
            drop(lists);
            return self.push_update(previous, updated).await;
        }
        let item = CountItem::optimistic(&scanned);
        items.insert(0, item.clone());
        drop(lists);

        match self.submit(ActionPayload::CreateItem(scanned)).await {
            Submitted::Sent => ItemChange { item: Some(item), delivery: Delivery::Sent },
            Submitted::Queued => ItemChange { item: Some(item), delivery: Delivery::Queued },
            Submitted::Rejected(reason) => {
                self.discard(&item.session_id, &item.id).await;
                self.notify_error(format!("Could not add {}: {reason}", item.ean), &item.ean);
                ItemChange { item: None, delivery: Delivery::RolledBack }
            },
        }
    }

    /// Set the counted quantity of an item already in the list.
    pub async fn update(
        &self,
        session_id: &str,
        ean: &str,
        quantity: i64,
    ) -> Result<ItemChange, ServiceError> {
        let target = PreCountItem::new(session_id, ean, None, quantity)?;
        let mut lists = self.lists.write().await;
        let item = lists
            .get_mut(session_id)
            .and_then(|items| items.iter_mut().find(|item| item.ean == target.ean))
            .ok_or_else(|| ServiceError::NotFound(format!("item {} in session {session_id}", target.ean)))?;
        let previous = item.clone();
        item.quantity = quantity;
        item.synced = false;
        let updated = item.clone();
        drop(lists);
        Ok(self.push_update(previous, updated).await)
    }

    async fn push_update(&self, previous: CountItem, updated: CountItem) -> ItemChange {
        match self.submit(ActionPayload::UpdateItem(updated.to_payload())).await {
            Submitted::Sent => ItemChange { item: Some(updated), delivery: Delivery::Sent },
            Submitted::Queued => ItemChange { item: Some(updated), delivery: Delivery::Queued },
            Submitted::Rejected(reason) => {
                let item = self.restore(&previous, updated.quantity).await;
                self.notify_error(format!("Could not update {}: {reason}", updated.ean), &updated.ean);
                ItemChange { item, delivery: Delivery::RolledBack }
            },
        }
    }

    /// Take an item out of the list. It can be brought back with
    /// [`Self::undo_remove`] until the undo window closes.
    pub async fn remove(&self, session_id: &str, ean: &str) -> Result<ItemChange, ServiceError> {
        let ean = normalize_ean(ean)?;
        let mut lists = self.lists.write().await;
        let items = lists
            .get_mut(session_id)
            .ok_or_else(|| ServiceError::NotFound(format!("session {session_id}")))?;
        let position = items
            .iter()
            .position(|item| item.ean == ean)
            .ok_or_else(|| ServiceError::NotFound(format!("item {ean} in session {session_id}")))?;
        let item = items.remove(position);
        drop(lists);

        let key = (session_id.to_owned(), ean.clone());
        {
            let mut removed = self.removed.lock().await;
            let window = self.undo_window;
            removed.retain(|_, entry| entry.removed_at.elapsed() <= window);
            removed.insert(key.clone(), RemovedItem { item: item.clone(), removed_at: Instant::now() });
        }

        let payload = ActionPayload::DeleteItem { session_id: session_id.to_owned(), ean: ean.clone() };
        match self.submit(payload).await {
            Submitted::Sent => Ok(ItemChange { item: Some(item), delivery: Delivery::Sent }),
            Submitted::Queued => Ok(ItemChange { item: Some(item), delivery: Delivery::Queued }),
            Submitted::Rejected(reason) => {
                self.removed.lock().await.remove(&key);
                {
                    let mut lists = self.lists.write().await;
                    let items = lists.entry(session_id.to_owned()).or_default();
                    if !items.iter().any(|existing| existing.ean == ean) {
                        items.insert(0, item.clone());
                    }
                }
                self.notify_error(format!("Could not remove {ean}: {reason}"), &ean);
                Ok(ItemChange { item: Some(item), delivery: Delivery::RolledBack })
            },
        }
    }

    /// Bring back a removed item as a fresh add. The earlier delete is not
    /// cancelled; the re-create simply follows it.
    pub async fn undo_remove(&self, session_id: &str, ean: &str) -> Result<ItemChange, ServiceError> {
        let ean = normalize_ean(ean)?;
        let key = (session_id.to_owned(), ean.clone());
        let entry = self
            .removed
            .lock()
            .await
            .remove(&key)
            .ok_or_else(|| ServiceError::NotFound(format!("removed item {ean} in session {session_id}")))?;
        if entry.removed_at.elapsed() > self.undo_window {
            return Err(ServiceError::UndoExpired { ean });
        }
        let restored = entry.item.to_payload();
        tracing::debug!(session_id, ean = %restored.ean, "Undoing removal");
        Ok(self.create(restored).await)
    }

    /// Merge one realtime confirmation into the affected list.
    pub async fn apply_event(&self, event: &RealtimeEvent) {
        let mut lists = self.lists.write().await;
        match event.session_id() {
            Some(session_id) => {
                let items = lists.remove(session_id).unwrap_or_default();
                lists.insert(session_id.to_owned(), reconcile(items, event));
            },
            None => {
                for items in lists.values_mut() {
                    *items = reconcile(std::mem::take(items), event);
                }
            },
        }
    }

    /// Consume realtime events until every sender is dropped.
    pub fn spawn_realtime_listener(
        self: &Arc<Self>,
        mut rx: mpsc::Receiver<RealtimeEvent>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                service.apply_event(&event).await;
            }
            tracing::debug!("Realtime channel closed");
        })
    }

    async fn submit(&self, payload: ActionPayload) -> Submitted {
        let target = payload.target();
        match self.sync.submit(payload).await {
            Ok(Submitted::Rejected(reason)) => {
                tracing::warn!(target_row = %target, error = %reason, "Remote call failed, rolling back");
                Submitted::Rejected(reason)
            },
            Ok(submitted) => submitted,
            Err(e) => {
                tracing::error!(target_row = %target, error = %e, "Could not persist change");
                Submitted::Rejected(e.to_string())
            },
        }
    }

    async fn discard(&self, session_id: &str, id: &str) {
        if let Some(items) = self.lists.write().await.get_mut(session_id) {
            items.retain(|item| item.id != id);
        }
    }

    /// Undo a failed update, unless the user has changed the row again since.
    async fn restore(&self, previous: &CountItem, sent_quantity: i64) -> Option<CountItem> {
        let mut lists = self.lists.write().await;
        let item = lists
            .get_mut(&previous.session_id)?
            .iter_mut()
            .find(|item| item.has_key(&previous.session_id, &previous.ean))?;
        if item.quantity == sent_quantity {
            item.quantity = previous.quantity;
            item.synced = previous.synced;
        }
        Some(item.clone())
    }

    fn notify_error(&self, message: String, ean: &str) {
        tracing::warn!(ean, "{message}");
        let notification = Notification::error(message, Some(ean));
        let _ = self.event_tx.send(SyncEvent::Notification { notification });
    }
}

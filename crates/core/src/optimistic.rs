//! Optimistic pre-count items and their reconciliation with realtime
//! confirmations from the backend.
//!
//! `reconcile` is a pure merge: it never blindly overwrites local state. An
//! optimistic row is matched to its confirmed counterpart by the business key
//! `(session_id, ean)` and is promoted to `synced` only when the confirmed
//! quantity is the one the user last set.

use serde::{Deserialize, Serialize};

use crate::constants::TEMP_ID_PREFIX;
use crate::inventory::PreCountItem;

/// A pre-count row as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountItem {
    /// Server id, or a `tmp-` placeholder until the backend confirms the row.
    pub id: String,
    pub session_id: String,
    pub ean: String,
    pub product_name: Option<String>,
    pub quantity: i64,
    /// `false` while the latest local value is unconfirmed.
    pub synced: bool,
}

impl CountItem {
    /// Unconfirmed row with a fresh placeholder id.
    #[must_use]
    pub fn optimistic(item: &PreCountItem) -> Self {
        Self {
            id: format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4()),
            session_id: item.session_id.clone(),
            ean: item.ean.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            synced: false,
        }
    }

    #[must_use]
    pub fn confirmed(record: &RemoteItem) -> Self {
        Self {
            id: record.id.clone(),
            session_id: record.session_id.clone(),
            ean: record.ean.clone(),
            product_name: record.product_name.clone(),
            quantity: record.quantity,
            synced: true,
        }
    }

    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    #[must_use]
    pub fn has_key(&self, session_id: &str, ean: &str) -> bool {
        self.session_id == session_id && self.ean == ean
    }

    /// Payload sent to the backend for this row's current value.
    #[must_use]
    pub fn to_payload(&self) -> PreCountItem {
        PreCountItem {
            session_id: self.session_id.clone(),
            ean: self.ean.clone(),
            product_name: self.product_name.clone(),
            quantity: self.quantity,
        }
    }
}

/// A `pre_count_items` row as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: String,
    pub session_id: String,
    pub ean: String,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: i64,
}

/// Identity of a deleted row. The backend always sends the id; the business
/// key is present when the table replicates full old rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedItem {
    pub id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub ean: Option<String>,
}

/// Row-level change pushed by the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum RealtimeEvent {
    Insert { record: RemoteItem },
    Update { record: RemoteItem },
    Delete { old_record: DeletedItem },
}

impl RealtimeEvent {
    /// Session the event belongs to, when known.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Insert { record } | Self::Update { record } => Some(&record.session_id),
            Self::Delete { old_record } => old_record.session_id.as_deref(),
        }
    }
}

/// Merge one realtime event into the local list.
#[must_use]
pub fn reconcile(mut items: Vec<CountItem>, event: &RealtimeEvent) -> Vec<CountItem> {
    match event {
        RealtimeEvent::Insert { record } | RealtimeEvent::Update { record } => {
            let position = items.iter().position(|item| item.has_key(&record.session_id, &record.ean));
            match position.and_then(|pos| items.get_mut(pos)) {
                Some(local) if !local.synced && local.quantity != record.quantity => {
                    // A newer local edit is still in flight; only adopt the server id.
                    local.id.clone_from(&record.id);
                },
                Some(local) => *local = CountItem::confirmed(record),
                None => items.insert(0, CountItem::confirmed(record)),
            }
        },
        RealtimeEvent::Delete { old_record } => {
            let position = items.iter().position(|item| item.id == old_record.id).or_else(|| {
                match (old_record.session_id.as_deref(), old_record.ean.as_deref()) {
                    (Some(session_id), Some(ean)) => {
                        items.iter().position(|item| item.has_key(session_id, ean))
                    },
                    _ => None,
                }
            });
            // An unsynced row with the same key is a pending re-create; keep it.
            if let Some(pos) = position.filter(|&pos| items.get(pos).is_some_and(|item| item.synced))
            {
                items.remove(pos);
            }
        },
    }
    items
}

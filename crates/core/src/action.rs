//! Queued mutations and their lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::inventory::{CountSession, PreCountItem, Product, ProductPatch, SessionPatch};

/// Kind of mutation a queued action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

impl ActionType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for ActionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(CoreError::UnknownVariant { kind: "action type", value: s.to_owned() }),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical entity an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Session,
    Item,
    Product,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Session => "session",
            Self::Item => "item",
            Self::Product => "product",
        }
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(Self::Session),
            "item" => Ok(Self::Item),
            "product" => Ok(Self::Product),
            _ => Err(CoreError::UnknownVariant { kind: "entity", value: s.to_owned() }),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a queued action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    /// Waiting for the next drain.
    Pending,
    /// Currently being executed against the remote backend.
    Syncing,
    /// Confirmed remotely. Confirmed records are deleted in the same step,
    /// so no stored row carries this status; it is accepted when parsing.
    Success,
    /// Retry bound reached; still re-attempted by later drains until cleared.
    Failed,
}

impl ActionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for ActionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "syncing" => Ok(Self::Syncing),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(CoreError::UnknownVariant { kind: "action status", value: s.to_owned() }),
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed payload of a queued action, one variant per `entity × type` pair.
///
/// Item creates and updates both carry the absolute quantity so replaying
/// either is an idempotent upsert on `(session_id, ean)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum ActionPayload {
    CreateSession(CountSession),
    UpdateSession { id: String, patch: SessionPatch },
    DeleteSession { id: String },
    CreateItem(PreCountItem),
    UpdateItem(PreCountItem),
    DeleteItem { session_id: String, ean: String },
    CreateProduct(Product),
    UpdateProduct { ean: String, patch: ProductPatch },
    DeleteProduct { ean: String },
}

impl ActionPayload {
    #[must_use]
    pub const fn action_type(&self) -> ActionType {
        match *self {
            Self::CreateSession(_) | Self::CreateItem(_) | Self::CreateProduct(_) => {
                ActionType::Create
            },
            Self::UpdateSession { .. } | Self::UpdateItem(_) | Self::UpdateProduct { .. } => {
                ActionType::Update
            },
            Self::DeleteSession { .. } | Self::DeleteItem { .. } | Self::DeleteProduct { .. } => {
                ActionType::Delete
            },
        }
    }

    #[must_use]
    pub const fn entity(&self) -> EntityKind {
        match *self {
            Self::CreateSession(_) | Self::UpdateSession { .. } | Self::DeleteSession { .. } => {
                EntityKind::Session
            },
            Self::CreateItem(_) | Self::UpdateItem(_) | Self::DeleteItem { .. } => {
                EntityKind::Item
            },
            Self::CreateProduct(_) | Self::UpdateProduct { .. } | Self::DeleteProduct { .. } => {
                EntityKind::Product
            },
        }
    }

    /// Identifier of the targeted row, for logs and the inspection view.
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Self::CreateSession(session) => session.id.clone(),
            Self::UpdateSession { id, .. } | Self::DeleteSession { id } => id.clone(),
            Self::CreateItem(item) | Self::UpdateItem(item) => {
                format!("{}/{}", item.session_id, item.ean)
            },
            Self::DeleteItem { session_id, ean } => format!("{session_id}/{ean}"),
            Self::CreateProduct(product) => product.ean.clone(),
            Self::UpdateProduct { ean, .. } | Self::DeleteProduct { ean } => ean.clone(),
        }
    }

    /// Encode for the `payload` column.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the `payload` column.
    ///
    /// # Errors
    /// Returns an error if the stored JSON does not match any variant.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// A mutation not yet confirmed by the remote backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Local auto-increment id.
    pub id: i64,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub entity: EntityKind,
    #[serde(rename = "data")]
    pub payload: ActionPayload,
    /// Creation time, epoch milliseconds. Drains go oldest first.
    pub timestamp: i64,
    pub status: ActionStatus,
    pub retries: u32,
    pub error: Option<String>,
    pub updated_at: Option<i64>,
}

/// Partial update merged into a stored action. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionPatch {
    pub status: Option<ActionStatus>,
    pub retries: Option<u32>,
    pub error: Option<String>,
}

impl ActionPatch {
    #[must_use]
    pub fn syncing() -> Self {
        Self { status: Some(ActionStatus::Syncing), ..Self::default() }
    }

    /// Back to `pending` without touching retries, for records whose
    /// bookkeeping broke mid-drain.
    #[must_use]
    pub fn released() -> Self {
        Self { status: Some(ActionStatus::Pending), ..Self::default() }
    }

    /// Failed attempt below the retry bound: eligible for the next drain.
    #[must_use]
    pub fn retry(retries: u32, error: impl Into<String>) -> Self {
        Self {
            status: Some(ActionStatus::Pending),
            retries: Some(retries),
            error: Some(error.into()),
        }
    }

    /// Failed attempt that exhausts the bound.
    #[must_use]
    pub fn failed(retries: u32, error: impl Into<String>) -> Self {
        Self {
            status: Some(ActionStatus::Failed),
            retries: Some(retries),
            error: Some(error.into()),
        }
    }
}

/// Queue counts for the inspection view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub syncing: u64,
    pub failed: u64,
    pub total: u64,
    /// Timestamp of the oldest pending or failed action.
    pub oldest_pending_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_derives_type_and_entity() {
        let payload = ActionPayload::DeleteItem { session_id: "s-1".into(), ean: "779".into() };
        assert_eq!(payload.action_type(), ActionType::Delete);
        assert_eq!(payload.entity(), EntityKind::Item);
        assert_eq!(payload.target(), "s-1/779");
    }

    #[test]
    fn payload_json_is_tagged() {
        let payload = ActionPayload::DeleteProduct { ean: "779".into() };
        let json: serde_json::Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
        assert_eq!(json["action"], "delete_product");
        assert_eq!(json["payload"]["ean"], "779");
        assert_eq!(ActionPayload::from_json(&json.to_string()).unwrap(), payload);
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert!("done".parse::<ActionStatus>().is_err());
        assert_eq!("failed".parse::<ActionStatus>().unwrap(), ActionStatus::Failed);
    }

    #[test]
    fn success_status_parses_and_displays() {
        let status = "success".parse::<ActionStatus>().unwrap();
        assert_eq!(status, ActionStatus::Success);
        assert_eq!(status.to_string(), "success");
    }

    #[test]
    fn released_patch_keeps_retries() {
        let patch = ActionPatch::released();
        assert_eq!(patch.status, Some(ActionStatus::Pending));
        assert_eq!(patch.retries, None);
        assert_eq!(patch.error, None);
    }
}

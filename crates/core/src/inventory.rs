use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// An inventory count session at one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountSession {
    pub id: String,
    pub branch_id: String,
    pub name: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl CountSession {
    /// New open session with a client-generated id, so replays upsert the same row.
    #[must_use]
    pub fn open(branch_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            branch_id: branch_id.into(),
            name: name.into(),
            status: SessionStatus::Open,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
    Cancelled,
}

impl std::str::FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(CoreError::UnknownVariant { kind: "session status", value: s.to_owned() }),
        }
    }
}

/// Partial update of a count session. `None` fields are left untouched remotely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

/// One scanned product inside a count session. `(session_id, ean)` is the business key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreCountItem {
    pub session_id: String,
    pub ean: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub quantity: i64,
}

impl PreCountItem {
    /// Validated constructor.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty session id, an empty or non-printable
    /// EAN, or a negative quantity.
    pub fn new(
        session_id: impl Into<String>,
        ean: impl Into<String>,
        product_name: Option<String>,
        quantity: i64,
    ) -> Result<Self, CoreError> {
        let session_id = session_id.into();
        let ean = normalize_ean(&ean.into())?;
        if session_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("session id must not be empty".to_owned()));
        }
        if quantity < 0 {
            return Err(CoreError::InvalidInput(format!("quantity must be >= 0, got {quantity}")));
        }
        Ok(Self { session_id, ean, product_name, quantity })
    }
}

/// Catalog entry keyed by EAN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub ean: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub laboratory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub laboratory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
}

/// Trim a scanned barcode and reject empty or control-character input.
///
/// # Errors
/// Returns `InvalidInput` when nothing printable remains.
pub fn normalize_ean(raw: &str) -> Result<String, CoreError> {
    let ean = raw.trim();
    if ean.is_empty() {
        return Err(CoreError::InvalidInput("ean must not be empty".to_owned()));
    }
    if ean.chars().any(char::is_control) {
        return Err(CoreError::InvalidInput(format!("ean contains control characters: {ean:?}")));
    }
    Ok(ean.to_owned())
}

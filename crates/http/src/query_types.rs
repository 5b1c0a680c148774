//! Request/query types (Deserialize)

use pharmasync_core::constants::{DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT};
use serde::Deserialize;

const fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl QueueQuery {
    /// Cap limit to prevent unbounded queries.
    pub fn capped_limit(&self) -> usize {
        self.limit.min(MAX_QUERY_LIMIT)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemsQuery {
    /// Re-read the session from the backend before answering.
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetConnectivityRequest {
    pub online: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub ean: String,
    pub quantity: i64,
    #[serde(default)]
    pub product_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

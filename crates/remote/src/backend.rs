use async_trait::async_trait;
use pharmasync_core::ActionPayload;
use pharmasync_core::RemoteItem;
use pharmasync_core::constants::{PRE_COUNT_ITEMS_TABLE, PRODUCTS_TABLE, SESSIONS_TABLE};

use crate::client::RestClient;
use crate::error::RemoteError;

/// The operations the sync layer needs from the hosted backend.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Apply one queued mutation. Must be safe to call again with the same payload.
    async fn execute(&self, payload: &ActionPayload) -> Result<(), RemoteError>;

    /// Current pre-count rows of a session.
    async fn fetch_items(&self, session_id: &str) -> Result<Vec<RemoteItem>, RemoteError>;
}

#[async_trait]
impl RemoteBackend for RestClient {
    async fn execute(&self, payload: &ActionPayload) -> Result<(), RemoteError> {
        match payload {
            ActionPayload::CreateSession(session) => {
                self.upsert(SESSIONS_TABLE, "id", session).await
            },
            ActionPayload::UpdateSession { id, patch } => {
                self.patch(SESSIONS_TABLE, &[("id", id.as_str())], patch).await
            },
            ActionPayload::DeleteSession { id } => self.delete(SESSIONS_TABLE, &[("id", id.as_str())]).await,
            ActionPayload::CreateItem(item) | ActionPayload::UpdateItem(item) => {
                self.upsert(PRE_COUNT_ITEMS_TABLE, "session_id,ean", item).await
            },
            ActionPayload::DeleteItem { session_id, ean } => {
                self.delete(PRE_COUNT_ITEMS_TABLE, &[("session_id", session_id.as_str()), ("ean", ean.as_str())])
                    .await
            },
            ActionPayload::CreateProduct(product) => {
                self.upsert(PRODUCTS_TABLE, "ean", product).await
            },
            ActionPayload::UpdateProduct { ean, patch } => {
                self.patch(PRODUCTS_TABLE, &[("ean", ean.as_str())], patch).await
            },
            ActionPayload::DeleteProduct { ean } => {
                self.delete(PRODUCTS_TABLE, &[("ean", ean.as_str())]).await
            },
        }
    }

    async fn fetch_items(&self, session_id: &str) -> Result<Vec<RemoteItem>, RemoteError> {
        self.select(PRE_COUNT_ITEMS_TABLE, &[("session_id", session_id)]).await
    }
}

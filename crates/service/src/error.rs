//! Typed error enum for the service layer.
//!
//! Remote failures inside a drain or an optimistic mutation never surface
//! here; they become record state or notifications. What remains is local
//! storage trouble and caller mistakes.

use pharmasync_core::CoreError;
use pharmasync_remote::RemoteError;
use pharmasync_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Queue store operation failed.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Remote call failed outside a drain (snapshot load).
    #[error("remote: {0}")]
    Remote(#[from] RemoteError),

    /// Caller provided invalid input (empty EAN, negative quantity).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The undo window for a removed item has closed.
    #[error("undo window expired for {ean}")]
    UndoExpired { ean: String },
}

impl ServiceError {
    /// Whether this error is likely transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_transient(),
            Self::Remote(e) => e.is_transient(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

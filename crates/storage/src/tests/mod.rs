//! Test utilities and module declarations for storage tests.

use crate::Storage;
use pharmasync_core::{ActionPayload, PreCountItem};
use tempfile::TempDir;

#[expect(clippy::unwrap_used, reason = "test code")]
pub fn create_test_storage() -> (Storage, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("queue.db");
    let storage = Storage::new(&db_path, 2).unwrap();
    (storage, temp_dir)
}

#[expect(clippy::unwrap_used, reason = "test code")]
pub fn create_item_payload(ean: &str, quantity: i64) -> ActionPayload {
    ActionPayload::CreateItem(PreCountItem::new("session-1", ean, None, quantity).unwrap())
}

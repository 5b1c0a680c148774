use std::sync::Arc;
use std::time::Duration;

use pharmasync_core::{ActionPayload, DeletedItem, RealtimeEvent};
use tokio::sync::mpsc;

use super::{Harness, drain_events, harness};
use crate::{Delivery, PreCountService, ServiceError, SyncEvent};

const EAN: &str = "7791234567890";

fn service(h: &Harness) -> PreCountService {
    PreCountService::new(Arc::clone(&h.sync), Duration::from_secs(5))
}

fn notifications(events: &[SyncEvent]) -> usize {
    events.iter().filter(|event| matches!(event, SyncEvent::Notification { .. })).count()
}

#[tokio::test]
async fn test_offline_scan_confirmed_after_reconnect() {
    let h = harness(false);
    let svc = service(&h);

    let change = svc.add("s1", EAN, None, 5).await.unwrap();
    assert_eq!(change.delivery, Delivery::Queued);
    let items = svc.items("s1").await;
    assert_eq!(items.len(), 1);
    assert!(!items[0].synced);
    assert!(items[0].is_temporary());
    assert_eq!(h.sync.store().stats().await.unwrap().pending, 1);

    h.sync.set_online(true);
    let report = h.sync.drain().await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(h.sync.store().stats().await.unwrap().total, 0);

    let record = h.backend.row("s1", EAN).unwrap();
    let event = RealtimeEvent::Insert { record: record.clone() };
    svc.apply_event(&event).await;
    svc.apply_event(&event).await;

    let items = svc.items("s1").await;
    assert_eq!(items.len(), 1);
    assert!(items[0].synced);
    assert_eq!(items[0].id, record.id);
    assert_eq!(items[0].quantity, 5);
}

#[tokio::test]
async fn test_online_add_is_sent_through_queue() {
    let h = harness(true);
    let svc = service(&h);

    let change = svc.add("s1", EAN, Some("Ibuprofeno 400".to_owned()), 2).await.unwrap();

    assert_eq!(change.delivery, Delivery::Sent);
    assert!(!change.item.unwrap().synced);
    assert_eq!(h.backend.row("s1", EAN).unwrap().quantity, 2);
    assert_eq!(h.sync.store().stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_failed_add_rolls_back_with_one_notification() {
    let h = harness(true);
    let svc = service(&h);
    h.backend.fail_with(Some(500));
    let mut rx = h.sync.subscribe();

    let change = svc.add("s1", EAN, None, 1).await.unwrap();

    assert_eq!(change.delivery, Delivery::RolledBack);
    assert!(change.item.is_none());
    assert!(svc.items("s1").await.is_empty());
    assert_eq!(notifications(&drain_events(&mut rx)), 1);
    assert_eq!(h.sync.store().stats().await.unwrap().total, 0);

    // The withdrawn create is not replayed once the backend recovers.
    h.backend.fail_with(None);
    h.sync.drain().await.unwrap();
    assert!(h.backend.row("s1", EAN).is_none());
}

#[tokio::test]
async fn test_online_update_lands_after_older_queued_create() {
    let h = harness(false);
    let svc = service(&h);
    svc.add("s1", EAN, None, 5).await.unwrap();
    h.sync.set_online(true);
    h.backend.fail_with(Some(503));
    h.sync.drain().await.unwrap();
    assert_eq!(h.sync.store().stats().await.unwrap().pending, 1);
    h.backend.fail_with(None);

    let change = svc.update("s1", EAN, 9).await.unwrap();

    assert_eq!(change.delivery, Delivery::Sent);
    assert_eq!(h.backend.row("s1", EAN).unwrap().quantity, 9);
    h.sync.drain().await.unwrap();
    assert_eq!(h.backend.row("s1", EAN).unwrap().quantity, 9);
    assert_eq!(h.sync.store().stats().await.unwrap().total, 0);

    let record = h.backend.row("s1", EAN).unwrap();
    svc.apply_event(&RealtimeEvent::Insert { record }).await;
    let items = svc.items("s1").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 9);
    assert!(items[0].synced);
}

#[tokio::test]
async fn test_online_update_waits_behind_failing_create() {
    let h = harness(false);
    let svc = service(&h);
    svc.add("s1", EAN, None, 5).await.unwrap();
    h.sync.set_online(true);
    h.backend.fail_with(Some(503));
    h.sync.drain().await.unwrap();
    let mut rx = h.sync.subscribe();

    let change = svc.update("s1", EAN, 9).await.unwrap();

    assert_eq!(change.delivery, Delivery::Queued);
    assert_eq!(change.item.unwrap().quantity, 9);
    assert_eq!(svc.items("s1").await[0].quantity, 9);
    assert_eq!(notifications(&drain_events(&mut rx)), 0);
    assert_eq!(h.sync.store().stats().await.unwrap().pending, 2);

    h.backend.fail_with(None);
    let report = h.sync.drain().await.unwrap();

    assert_eq!(report.succeeded, 2);
    let calls = h.backend.calls();
    let tail = &calls[calls.len() - 2..];
    assert!(matches!(&tail[0], ActionPayload::CreateItem(item) if item.quantity == 5));
    assert!(matches!(&tail[1], ActionPayload::UpdateItem(item) if item.quantity == 9));
    assert_eq!(h.backend.row("s1", EAN).unwrap().quantity, 9);
}

#[tokio::test]
async fn test_rescan_increments_existing_item() {
    let h = harness(false);
    let svc = service(&h);

    svc.add("s1", EAN, None, 3).await.unwrap();
    svc.add("s1", EAN, None, 2).await.unwrap();

    let items = svc.items("s1").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 5);
    let queued: Vec<ActionPayload> =
        h.sync.store().list_pending().await.unwrap().into_iter().map(|a| a.payload).collect();
    assert!(matches!(&queued[0], ActionPayload::CreateItem(item) if item.quantity == 3));
    assert!(matches!(&queued[1], ActionPayload::UpdateItem(item) if item.quantity == 5));
}

#[tokio::test]
async fn test_failed_update_restores_previous_value() {
    let h = harness(true);
    let svc = service(&h);
    svc.add("s1", EAN, None, 5).await.unwrap();
    let record = h.backend.row("s1", EAN).unwrap();
    svc.apply_event(&RealtimeEvent::Insert { record }).await;
    h.backend.fail_with(Some(503));
    let mut rx = h.sync.subscribe();

    let change = svc.update("s1", EAN, 8).await.unwrap();

    assert_eq!(change.delivery, Delivery::RolledBack);
    let item = change.item.unwrap();
    assert_eq!(item.quantity, 5);
    assert!(item.synced);
    assert_eq!(svc.items("s1").await, vec![item]);
    assert_eq!(notifications(&drain_events(&mut rx)), 1);
}

#[tokio::test]
async fn test_update_of_unknown_item_is_not_found() {
    let h = harness(true);
    let svc = service(&h);

    let err = svc.update("s1", EAN, 1).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_invalid_scans_are_rejected() {
    let h = harness(true);
    let svc = service(&h);

    assert!(matches!(svc.add("s1", EAN, None, 0).await, Err(ServiceError::InvalidInput(_))));
    assert!(matches!(svc.add("s1", "  ", None, 1).await, Err(ServiceError::InvalidInput(_))));
    assert!(matches!(svc.update("s1", EAN, -1).await, Err(ServiceError::InvalidInput(_))));
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn test_undo_remove_recreates_item() {
    let h = harness(false);
    let svc = service(&h);
    svc.add("s1", EAN, None, 4).await.unwrap();

    let removed = svc.remove("s1", EAN).await.unwrap();
    assert_eq!(removed.delivery, Delivery::Queued);
    assert!(svc.items("s1").await.is_empty());

    let undone = svc.undo_remove("s1", EAN).await.unwrap();
    assert_eq!(undone.delivery, Delivery::Queued);
    let items = svc.items("s1").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 4);
    assert!(!items[0].synced);

    // create, delete, create: the delete is not cancelled.
    let queued = h.sync.store().list_pending().await.unwrap();
    assert_eq!(queued.len(), 3);
    assert!(matches!(queued[1].payload, ActionPayload::DeleteItem { .. }));

    h.sync.set_online(true);
    h.sync.drain().await.unwrap();
    assert_eq!(h.backend.row("s1", EAN).unwrap().quantity, 4);
}

#[tokio::test]
async fn test_undo_after_window_is_rejected() {
    let h = harness(false);
    let svc = PreCountService::new(Arc::clone(&h.sync), Duration::from_millis(10));
    svc.add("s1", EAN, None, 1).await.unwrap();
    svc.remove("s1", EAN).await.unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;

    let err = svc.undo_remove("s1", EAN).await.unwrap_err();
    assert!(matches!(err, ServiceError::UndoExpired { .. }));
    assert!(svc.items("s1").await.is_empty());
    assert!(svc.undo_remove("s1", EAN).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_failed_remove_reinserts_item() {
    let h = harness(true);
    let svc = service(&h);
    svc.add("s1", EAN, None, 2).await.unwrap();
    h.backend.fail_with(Some(500));
    let mut rx = h.sync.subscribe();

    let change = svc.remove("s1", EAN).await.unwrap();

    assert_eq!(change.delivery, Delivery::RolledBack);
    let items = svc.items("s1").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].ean, EAN);
    assert_eq!(notifications(&drain_events(&mut rx)), 1);
    assert!(svc.undo_remove("s1", EAN).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_load_merges_snapshot_with_unconfirmed_rows() {
    let h = harness(false);
    let svc = service(&h);
    let remote = h.backend.seed("s1", "7501", 7);
    svc.add("s1", EAN, None, 1).await.unwrap();

    let items = svc.load("s1").await.unwrap();

    assert_eq!(items.len(), 2);
    let confirmed = items.iter().find(|item| item.ean == "7501").unwrap();
    assert_eq!(confirmed.id, remote.id);
    assert!(confirmed.synced);
    let local = items.iter().find(|item| item.ean == EAN).unwrap();
    assert!(!local.synced);
}

#[tokio::test]
async fn test_realtime_listener_applies_events() {
    let h = harness(true);
    let svc = Arc::new(service(&h));
    let (tx, rx) = mpsc::channel(8);
    let listener = svc.spawn_realtime_listener(rx);
    let record = h.backend.seed("s1", "7501", 3);

    tx.send(RealtimeEvent::Insert { record: record.clone() }).await.unwrap();
    tx.send(RealtimeEvent::Delete {
        old_record: DeletedItem { id: "unknown".to_owned(), session_id: None, ean: None },
    })
    .await
    .unwrap();
    drop(tx);
    listener.await.unwrap();

    let items = svc.items("s1").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, record.id);
}

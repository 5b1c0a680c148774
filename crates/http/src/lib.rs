//! HTTP inspection API for pharmasync.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(unreachable_pub, reason = "pub items are re-exported")]
#![allow(clippy::absolute_paths, reason = "Explicit paths for clarity")]
#![allow(missing_copy_implementations, reason = "Types may grow")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short closure params are idiomatic")]
#![allow(clippy::exhaustive_structs, reason = "HTTP types are stable")]

pub mod api_error;
mod handlers;
mod query_types;
mod response_types;

use axum::{
    Json, Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pharmasync_core::RealtimeEvent;
use pharmasync_service::{PreCountService, QueueService, SyncManager};

pub use response_types::VersionResponse;

/// Shared application state for all HTTP handlers.
pub struct AppState {
    /// Drain entry point, connectivity flag and event channel
    pub sync: Arc<SyncManager>,
    /// Read-only queue inspection
    pub queue_service: Arc<QueueService>,
    /// Optimistic pre-count lists
    pub pre_count: Arc<PreCountService>,
    /// Feeds the realtime listener task
    pub realtime_tx: mpsc::Sender<RealtimeEvent>,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/version", get(version))
        .route("/api/sync-queue", get(handlers::queue::get_sync_queue))
        .route("/api/sync-queue/stats", get(handlers::queue::get_queue_stats))
        .route("/api/sync-queue/drain", post(handlers::queue::drain_queue))
        .route("/api/sync-queue/failed", axum::routing::delete(handlers::queue::clear_failed))
        .route(
            "/api/connectivity",
            get(handlers::connectivity::get_connectivity)
                .post(handlers::connectivity::set_connectivity),
        )
        .route("/events", get(handlers::events::sse_events))
        .route(
            "/api/pre-count/{session_id}/items",
            get(handlers::pre_count::list_items).post(handlers::pre_count::add_item),
        )
        .route(
            "/api/pre-count/{session_id}/items/{ean}",
            put(handlers::pre_count::update_item).delete(handlers::pre_count::remove_item),
        )
        .route(
            "/api/pre-count/{session_id}/items/{ean}/undo",
            post(handlers::pre_count::undo_remove),
        )
        .route("/api/realtime", post(handlers::realtime::ingest))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse { version: env!("CARGO_PKG_VERSION") })
}

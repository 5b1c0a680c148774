use axum::{
    Json,
    extract::{Query, State},
};
use std::sync::Arc;

use pharmasync_core::QueueStats;
use pharmasync_service::{DrainReport, QueueSnapshot};

use crate::AppState;
use crate::api_error::ApiError;
use crate::query_types::QueueQuery;
use crate::response_types::ClearFailedResponse;

pub async fn get_sync_queue(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<QueueSnapshot>, ApiError> {
    let snapshot = state.queue_service.snapshot(query.capped_limit()).await?;
    Ok(Json(snapshot))
}

pub async fn get_queue_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<QueueStats>, ApiError> {
    Ok(Json(state.queue_service.stats().await?))
}

pub async fn drain_queue(State(state): State<Arc<AppState>>) -> Result<Json<DrainReport>, ApiError> {
    Ok(Json(state.queue_service.force_drain().await?))
}

pub async fn clear_failed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearFailedResponse>, ApiError> {
    let cleared = state.queue_service.clear_failed().await?;
    Ok(Json(ClearFailedResponse { cleared }))
}

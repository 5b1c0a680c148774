use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;

use pharmasync_core::RealtimeEvent;

use crate::AppState;
use crate::api_error::ApiError;
use crate::response_types::AcceptedResponse;

/// Webhook for row changes pushed by the backend's realtime channel.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(event): Json<RealtimeEvent>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    state.realtime_tx.send(event).await.map_err(|_closed| {
        ApiError::ServiceUnavailable("realtime listener is not running".to_owned())
    })?;
    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true })))
}

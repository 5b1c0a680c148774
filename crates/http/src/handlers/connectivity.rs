use axum::{Json, extract::State};
use std::sync::Arc;

use crate::AppState;
use crate::query_types::SetConnectivityRequest;
use crate::response_types::{ConnectivityResponse, SetConnectivityResponse};

pub async fn get_connectivity(State(state): State<Arc<AppState>>) -> Json<ConnectivityResponse> {
    Json(ConnectivityResponse {
        online: state.sync.connectivity().is_online(),
        draining: state.sync.is_draining(),
    })
}

/// Host-reported connectivity. Going online wakes the reconnect listener,
/// which drains the queue in the background.
pub async fn set_connectivity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetConnectivityRequest>,
) -> Json<SetConnectivityResponse> {
    let changed = state.sync.set_online(req.online);
    Json(SetConnectivityResponse { online: req.online, changed })
}

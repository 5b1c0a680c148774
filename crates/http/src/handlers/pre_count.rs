use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use pharmasync_core::CountItem;
use pharmasync_service::ItemChange;

use crate::AppState;
use crate::api_error::ApiError;
use crate::query_types::{AddItemRequest, ItemsQuery, UpdateItemRequest};

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<Vec<CountItem>>, ApiError> {
    if query.refresh {
        return Ok(Json(state.pre_count.load(&session_id).await?));
    }
    Ok(Json(state.pre_count.items(&session_id).await))
}

pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<ItemChange>, ApiError> {
    let change = state.pre_count.add(&session_id, &req.ean, req.product_name, req.quantity).await?;
    Ok(Json(change))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path((session_id, ean)): Path<(String, String)>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemChange>, ApiError> {
    Ok(Json(state.pre_count.update(&session_id, &ean, req.quantity).await?))
}

pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path((session_id, ean)): Path<(String, String)>,
) -> Result<Json<ItemChange>, ApiError> {
    Ok(Json(state.pre_count.remove(&session_id, &ean).await?))
}

pub async fn undo_remove(
    State(state): State<Arc<AppState>>,
    Path((session_id, ean)): Path<(String, String)>,
) -> Result<Json<ItemChange>, ApiError> {
    Ok(Json(state.pre_count.undo_remove(&session_id, &ean).await?))
}

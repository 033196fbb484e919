//! Inventory item handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use inv_core::{parse_id, Id};
use inv_registry::ItemChanges;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, FormBody, PhotoPayload, RegisterPayload};
use crate::representers::{ItemResponse, MessageResponse};

/// Non-numeric ids can never match an item
fn item_id(raw: &str) -> ApiResult<Id> {
    parse_id(raw).ok_or(ApiError::NotFound)
}

/// Register a new item
///
/// POST /register
pub async fn register_item(
    State(state): State<AppState>,
    payload: RegisterPayload,
) -> ApiResult<impl IntoResponse> {
    let item = state
        .inventory
        .register(payload.item, payload.photo)
        .await?;

    Ok((StatusCode::CREATED, Json(ItemResponse::from(item))))
}

/// List all items in registration order
///
/// GET /inventory
pub async fn list_items(State(state): State<AppState>) -> Json<Vec<ItemResponse>> {
    let items = state.inventory.list().await;
    Json(items.into_iter().map(ItemResponse::from).collect())
}

/// GET /inventory/:id
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ItemResponse>> {
    let item = state.inventory.get(item_id(&id)?).await?;
    Ok(Json(item.into()))
}

/// Update name and/or description
///
/// PUT /inventory/:id
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    FormBody(changes): FormBody<ItemChanges>,
) -> ApiResult<Json<ItemResponse>> {
    let item = state
        .inventory
        .update_fields(item_id(&id)?, changes)
        .await?;
    Ok(Json(item.into()))
}

/// Stream the stored photo back
///
/// GET /inventory/:id/photo
pub async fn get_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (photo, data) = state.inventory.photo(item_id(&id)?).await?;

    Ok((
        [
            (header::CONTENT_TYPE, photo.content_type.clone()),
            (header::CONTENT_LENGTH, data.len().to_string()),
            (header::ETAG, photo.etag()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        data,
    ))
}

/// Replace the item's photo
///
/// PUT /inventory/:id/photo
pub async fn update_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    PhotoPayload(upload): PhotoPayload,
) -> ApiResult<Json<MessageResponse>> {
    state
        .inventory
        .replace_photo(item_id(&id)?, upload)
        .await?;
    Ok(Json(MessageResponse::new("Photo updated")))
}

/// DELETE /inventory/:id
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.inventory.delete(item_id(&id)?).await?;
    Ok(Json(MessageResponse::new("Deleted")))
}

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::services::ExpiryService;

/// Expired items still on the shelf. Runs a sweep first so the listing is
/// current even between scheduled runs.
pub async fn list_expired(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let items = ExpiryService::new(state.db.clone())
        .list_active_expired()
        .await?;
    Ok(Json(items))
}

pub async fn expired_history(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let items = ExpiryService::new(state.db.clone())
        .list_expired_history()
        .await?;
    Ok(Json(items))
}

pub async fn discard_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let item = ExpiryService::new(state.db.clone()).discard(id).await?;
    Ok(Json(json!({
        "message": "Medicine discarded successfully",
        "item": item,
    })))
}

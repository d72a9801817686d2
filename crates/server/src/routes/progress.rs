use crate::error::{ServerError, ServerResult};
use crate::routes::persist_catalog;
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Body of `POST /api/progress`. Every field is optional at the wire level so
/// that a missing one is reported as a 400 naming the field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    #[serde(default)]
    pub book_id: Option<String>,
    #[serde(default)]
    pub progress: Option<ProgressPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
    #[serde(default)]
    pub cfi: Option<String>,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub chapter_title: Option<String>,
}

fn missing(field: &str) -> ServerError {
    ServerError::BadRequest(format!("missing required field: {field}"))
}

/// `POST /api/progress`
pub async fn save_progress(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> ServerResult<impl IntoResponse> {
    let request: SaveProgressRequest = serde_json::from_slice(&body)?;

    let book_id = request
        .book_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| missing("bookId"))?;
    let progress = request.progress.ok_or_else(|| missing("progress"))?;
    let cfi = progress.cfi.ok_or_else(|| missing("progress.cfi"))?;
    let percentage = progress
        .percentage
        .ok_or_else(|| missing("progress.percentage"))?;

    let record = state.catalog.record_progress(
        &book_id,
        cfi,
        percentage,
        progress.chapter_title.unwrap_or_default(),
    );
    persist_catalog(&state).await?;

    Ok(Json(json!({
        "success": true,
        "bookId": book_id,
        "timestamp": record.timestamp,
    })))
}

/// `GET /api/progress/{id}`; an unknown id yields `progress: null`.
pub async fn get_progress(
    State(state): State<Arc<ServerState>>,
    Path(book_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let progress = state.catalog.get_progress(&book_id);
    Ok(Json(json!({
        "success": true,
        "bookId": book_id,
        "progress": progress,
    })))
}

/// `DELETE /api/progress/{id}`
pub async fn delete_progress(
    State(state): State<Arc<ServerState>>,
    Path(book_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let removed = state.catalog.remove_progress(&book_id);
    if removed {
        persist_catalog(&state).await?;
    }
    Ok(Json(json!({
        "success": true,
        "bookId": book_id,
        "removed": removed,
    })))
}

use crate::error::ServerResult;
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use ingest::{CoverUpload, IngestedBook};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub books: Vec<IngestedBook>,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverResponse {
    pub success: bool,
    pub cover_url: String,
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// `POST /api/upload`: store every `.epub` part of a multipart form.
pub async fn upload_books(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<impl IntoResponse> {
    let content_type = content_type(&headers);
    let task_state = state.clone();

    // Decoding, hashing and blob writes are synchronous
    let books = tokio::task::spawn_blocking(move || {
        shelf::upload_books(
            content_type.as_deref(),
            &body,
            &task_state.catalog,
            &task_state.config.ingest,
        )
    })
    .await??;

    let message = format!("Successfully uploaded {} book(s)", books.len());
    Ok(Json(UploadResponse {
        success: true,
        books,
        message,
    }))
}

/// `POST /api/upload-cover`: attach a cover image to an existing book.
pub async fn upload_cover(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<impl IntoResponse> {
    let content_type = content_type(&headers);
    let task_state = state.clone();

    let book_id = tokio::task::spawn_blocking(move || {
        let parts = ingest::decode_form(content_type.as_deref(), &body)?;
        let upload = CoverUpload::from_parts(parts)?;
        upload.apply(&task_state.catalog)?;
        Ok::<_, ingest::IngestError>(upload.book_id)
    })
    .await??;

    tracing::info!(book_id = %book_id, "cover_uploaded");
    Ok(Json(CoverResponse {
        success: true,
        cover_url: format!("/api/cover/{book_id}"),
    }))
}

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

const EPUB_MIME: &str = "application/epub+zip";
const COVER_MIME: &str = "image/jpeg";

/// `GET /api/books`: newest first.
pub async fn list_books(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let books = state.catalog.list_books();
    Ok(Json(json!({
        "success": true,
        "count": books.len(),
        "books": books,
    })))
}

/// Blob path and download name of a catalogued book.
fn locate_book(state: &ServerState, book_id: &str) -> ServerResult<(PathBuf, String)> {
    let path = state
        .catalog
        .book_file_path(book_id)
        .ok_or_else(|| ServerError::NotFound(format!("book {book_id}")))?;
    let filename = state
        .catalog
        .get_book(book_id)
        .map(|book| book.filename)
        .unwrap_or_else(|| format!("{book_id}.epub"));
    Ok((path, filename))
}

fn attachment_headers(response: &mut Response, filename: &str) {
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(EPUB_MIME));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(filename)) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
}

/// `GET /api/book/{id}`: the stored EPUB as an attachment.
pub async fn get_book(
    State(state): State<Arc<ServerState>>,
    Path(book_id): Path<String>,
) -> ServerResult<Response> {
    let (path, filename) = locate_book(&state, &book_id)?;
    let bytes = read_blob(&path, &book_id).await?;

    let mut response = bytes.into_response();
    attachment_headers(&mut response, &filename);
    Ok(response)
}

/// `HEAD /api/book/{id}`: same headers as `GET`, sized from file metadata.
pub async fn head_book(
    State(state): State<Arc<ServerState>>,
    Path(book_id): Path<String>,
) -> ServerResult<Response> {
    let (path, filename) = locate_book(&state, &book_id)?;
    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(err) => return Err(blob_error(err, &path, &book_id)),
    };

    let mut response = ().into_response();
    attachment_headers(&mut response, &filename);
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    Ok(response)
}

/// `DELETE /api/book/{id}`: drop the book, its files and its progress.
pub async fn delete_book(
    State(state): State<Arc<ServerState>>,
    Path(book_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let store = state.catalog.clone();
    let id = book_id.clone();
    // File deletion and the save are blocking I/O.
    let removed = tokio::task::spawn_blocking(move || {
        let removed = store.remove_with_files(&id);
        if removed {
            store.persist()?;
        }
        Ok::<_, catalog::CatalogError>(removed)
    })
    .await??;
    if !removed {
        return Err(ServerError::NotFound(format!("book {book_id}")));
    }
    tracing::info!(book_id = %book_id, "book_deleted");
    Ok(Json(json!({
        "success": true,
        "bookId": book_id,
    })))
}

/// `GET /api/cover/{id}`
pub async fn get_cover(
    State(state): State<Arc<ServerState>>,
    Path(book_id): Path<String>,
) -> ServerResult<Response> {
    let path = state
        .catalog
        .cover_path(&book_id)
        .ok_or_else(|| ServerError::NotFound(format!("cover for {book_id}")))?;
    let bytes = read_blob(&path, &book_id).await?;
    Ok(([(CONTENT_TYPE, HeaderValue::from_static(COVER_MIME))], bytes).into_response())
}

/// A recorded path whose file has vanished is a 404, anything else a 500.
async fn read_blob(path: &FsPath, book_id: &str) -> ServerResult<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|err| blob_error(err, path, book_id))
}

fn blob_error(err: std::io::Error, path: &FsPath, book_id: &str) -> ServerError {
    if err.kind() == std::io::ErrorKind::NotFound {
        tracing::warn!(book_id = %book_id, path = %path.display(), "blob_missing");
        ServerError::NotFound(format!("file for {book_id}"))
    } else {
        err.into()
    }
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 `filename*`.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if fallback == filename {
        return format!("attachment; filename=\"{filename}\"");
    }
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        percent_encode(filename)
    )
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-' | b'_' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

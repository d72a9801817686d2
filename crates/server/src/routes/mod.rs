//! API route handlers
//!
//! Routes are organized by functionality:
//!
//! - `upload`: multi-book upload and cover upload
//! - `books`: listing, download, removal and cover images
//! - `progress`: reading position save / load / clear
//! - `health`: liveness and catalog stats

pub mod books;
pub mod health;
pub mod progress;
pub mod upload;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use std::sync::Arc;

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound("no such route".to_string())
}

/// Save the catalog on the blocking pool; the save writes, fsyncs and renames.
pub(crate) async fn persist_catalog(state: &Arc<ServerState>) -> ServerResult<()> {
    let catalog = state.catalog.clone();
    tokio::task::spawn_blocking(move || catalog.persist()).await??;
    Ok(())
}

//! Shelf Ingest Layer
//!
//! This is where books enter the library. A browser posts one
//! `multipart/form-data` request holding any number of EPUB files, each
//! optionally paired with a JSON metadata blob and a cover image; we decode
//! it, group the pieces per book and hand the result to the catalog.
//!
//! ## What we do here
//!
//! - **Decode multipart bodies** - [`multipart::parse`] splits a raw body into
//!   [`Part`]s without any external parser. Malformed parts are dropped.
//! - **Group by book** - [`group_parts`] pairs every `.epub` file with its
//!   `metadata_<i>` field and `cover_<i>` file by position.
//! - **Store** - [`ingest`] assigns content-addressed ids, writes blobs, fills
//!   metadata defaults and saves the catalog snapshot once per request.
//! - **Degrade, don't abort** - a broken metadata blob or cover only affects
//!   its own book.
//!
//! ## Example
//!
//! ```
//! use catalog::{CatalogConfig, CatalogStore};
//! use ingest::{decode_form, ingest, IngestConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = CatalogStore::open(CatalogConfig::rooted_at(dir.path())).unwrap();
//!
//! let body = b"--b\r\n\
//! Content-Disposition: form-data; name=\"files\"; filename=\"dune.epub\"\r\n\r\n\
//! PK-bytes\r\n\
//! --b--\r\n";
//! let parts = decode_form(Some("multipart/form-data; boundary=b"), body).unwrap();
//! let books = ingest(parts, &store, &IngestConfig::default()).unwrap();
//!
//! assert_eq!(books[0].title, "dune");
//! assert!(store.get_book(&books[0].id).is_some());
//! ```

mod config;
mod error;
mod metadata;
pub mod multipart;
mod pipeline;

pub use crate::config::{ConfigError, IngestConfig};
pub use crate::error::IngestError;
pub use crate::metadata::{display_filename, title_from_filename, ResolvedMetadata, UploadMetadata};
pub use crate::multipart::{boundary_from_content_type, Part};
pub use crate::pipeline::{group_parts, ingest, CoverUpload, IngestedBook, UploadItem};

/// Decode a form body given the request's `Content-Type` header value.
///
/// A missing header, a non-multipart type or a missing boundary parameter is
/// a [`IngestError::MalformedRequest`].
pub fn decode_form(content_type: Option<&str>, body: &[u8]) -> Result<Vec<Part>, IngestError> {
    let content_type = content_type
        .ok_or_else(|| IngestError::MalformedRequest("missing Content-Type header".into()))?;
    let boundary = boundary_from_content_type(content_type)?;
    let parts = multipart::parse(body, &boundary)?;
    tracing::debug!(parts = parts.len(), bytes = body.len(), "form_decoded");
    Ok(parts)
}

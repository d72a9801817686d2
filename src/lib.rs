//! Workspace umbrella crate for shelf, a personal EPUB library.
//!
//! This crate stitches multipart decoding, ingestion and the catalog together
//! so callers can turn one upload request into stored books with a single call.
//!
//! ```
//! use shelf::{open_library, upload_books, IngestConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = open_library(dir.path()).unwrap();
//!
//! let body = b"--xyz\r\n\
//! Content-Disposition: form-data; name=\"book_0\"; filename=\"Emma.epub\"\r\n\r\n\
//! PK\x03\x04\r\n\
//! --xyz--\r\n";
//! let books = upload_books(
//!     Some("multipart/form-data; boundary=xyz"),
//!     body,
//!     &store,
//!     &IngestConfig::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(books[0].title, "Emma");
//! assert_eq!(store.list_books().len(), 1);
//! ```

pub use catalog::{
    Book, BookSummary, CatalogConfig, CatalogError, CatalogSnapshot, CatalogStats, CatalogStore,
    ReadingProgress, ValidationReport, generate_id, now_millis,
};
pub use ingest::{
    CoverUpload, IngestConfig, IngestError, IngestedBook, Part, UploadMetadata, decode_form,
    group_parts, ingest,
};

use std::path::Path;
use std::time::Instant;

/// Open (or create) a library laid out under `dir` with the default file names.
pub fn open_library(dir: impl AsRef<Path>) -> Result<CatalogStore, CatalogError> {
    CatalogStore::open(CatalogConfig::rooted_at(dir))
}

/// Decode a multipart upload and ingest every book in it.
///
/// `content_type` is the raw `Content-Type` header; its `boundary` parameter
/// drives the decoder. The catalog is saved once after all books are added.
pub fn upload_books(
    content_type: Option<&str>,
    body: &[u8],
    store: &CatalogStore,
    cfg: &IngestConfig,
) -> Result<Vec<IngestedBook>, IngestError> {
    let start = Instant::now();
    let parts = decode_form(content_type, body)?;
    let result = ingest(parts, store, cfg);

    match &result {
        Ok(books) => tracing::info!(
            books = books.len(),
            bytes = body.len(),
            elapsed_micros = start.elapsed().as_micros() as u64,
            "upload_processed"
        ),
        Err(err) => tracing::warn!(
            error = %err,
            bytes = body.len(),
            "upload_rejected"
        ),
    }
    result
}

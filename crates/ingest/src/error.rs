//! Error types produced by the ingest crate.
//!
//! | Error | Category | HTTP |
//! |-------|----------|------|
//! | [`MalformedRequest`](IngestError::MalformedRequest) | bad boundary, missing required form field | 400 |
//! | [`NoFilesUploaded`](IngestError::NoFilesUploaded) | upload carried no `.epub` part | 400 |
//! | [`TooManyFiles`](IngestError::TooManyFiles) | upload exceeds `max_files_per_upload` | 400 |
//! | [`Catalog`](IngestError::Catalog) | blob/snapshot write failed, unknown book id | 404 / 500 |
//!
//! Per-book problems inside a batch (a bad metadata blob, a cover that
//! could not be written) are not errors: that book is stored with defaults
//! and the batch carries on.
//!
//! ```rust
//! use ingest::IngestError;
//!
//! fn to_http_status(error: &IngestError) -> u16 {
//!     match error {
//!         IngestError::Catalog(catalog::CatalogError::NotFound(_)) => 404,
//!         IngestError::Catalog(_) => 500,
//!         _ => 400,
//!     }
//! }
//!
//! assert_eq!(to_http_status(&IngestError::NoFilesUploaded), 400);
//! ```
use catalog::CatalogError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// The request could not be decoded or lacks a required field.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// No part of the upload was a file ending in the book extension.
    #[error("no .epub files were uploaded")]
    NoFilesUploaded,

    #[error("too many files in one upload: {count} exceeds limit of {limit}")]
    TooManyFiles { count: usize, limit: usize },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

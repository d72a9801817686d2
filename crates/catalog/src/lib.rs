//! Shelf Catalog Layer
//!
//! The catalog is the durable heart of the library server. It knows which
//! books exist, where their EPUB blobs and covers live on disk, and how far
//! the reader got in each of them.
//!
//! ## What lives here
//!
//! - **Identity** - [`generate_id`] derives a stable `book_<content>_<name>` id
//!   from file bytes and filename. Same upload = same id, every time.
//! - **Data model** - [`Book`], [`ReadingProgress`] and the on-disk
//!   [`CatalogSnapshot`].
//! - **Store** - [`CatalogStore`] keeps the three in-memory maps behind one
//!   read-write lock and mirrors them to a JSON snapshot written with
//!   temp-file-then-rename.
//!
//! ## Example
//!
//! ```
//! use catalog::{CatalogConfig, CatalogStore, generate_id};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = CatalogStore::open(CatalogConfig::rooted_at(dir.path())).unwrap();
//!
//! let id = generate_id(b"epub bytes", "novel.epub");
//! assert!(id.starts_with("book_"));
//! assert!(store.get_book(&id).is_none());
//! ```

mod config;
mod error;
mod identity;
mod store;
mod types;

pub use crate::config::{CatalogConfig, ConfigError};
pub use crate::error::CatalogError;
pub use crate::identity::{digest_prefix, generate_id, ID_PREFIX};
pub use crate::store::{CatalogStats, CatalogStore, ValidationReport};
pub use crate::types::{Book, BookSummary, CatalogSnapshot, ReadingProgress};

/// Milliseconds since the Unix epoch, the unit used for `addedDate` and
/// progress timestamps.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

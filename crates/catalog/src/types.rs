//! Core data model for the catalog.
//!
//! ```text
//! CatalogSnapshot (books_data.json)
//! ├── books:            id -> Book
//! ├── book_files:       id -> path of the stored .epub blob
//! ├── reading_progress: id -> ReadingProgress
//! └── saved_at:         seconds since epoch (float)
//! ```
//!
//! Field names on the wire are camelCase (`fileSize`, `addedDate`,
//! `coverPath`, `chapterTitle`) so snapshots stay readable by the browser
//! client that consumes the same shapes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Content-addressed id, see [`crate::generate_id`]. Immutable once assigned.
    pub id: String,
    pub title: String,
    pub author: String,
    /// Original upload filename. Display only, never used to build paths.
    pub filename: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub identifier: String,
    /// Length in bytes of the stored blob.
    pub file_size: u64,
    /// Creation time in milliseconds since epoch, as a decimal string.
    pub added_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_path: Option<PathBuf>,
}

impl Book {
    pub fn has_cover(&self) -> bool {
        self.cover_path.is_some()
    }

    /// `addedDate` parsed back into milliseconds; unparseable values sort first.
    pub fn added_millis(&self) -> i64 {
        self.added_date.parse().unwrap_or(0)
    }
}

/// Last known reading position of one book. Overwritten on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    /// Opaque location locator, passed through untouched.
    pub cfi: String,
    /// Fraction read, within `[0, 1]`.
    pub percentage: f64,
    #[serde(default)]
    pub chapter_title: String,
    /// Milliseconds since epoch.
    pub timestamp: i64,
}

/// Durable on-disk representation of the whole catalog.
///
/// `BTreeMap` keeps the snapshot file ordered by id, so two saves of the same
/// state produce the same bytes apart from `saved_at`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub books: BTreeMap<String, Book>,
    #[serde(default)]
    pub book_files: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub reading_progress: BTreeMap<String, ReadingProgress>,
    #[serde(default)]
    pub saved_at: f64,
}

/// Listing projection of a [`Book`], as served by `GET /api/books`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: String,
    pub title: String,
    pub author: String,
    pub filename: String,
    pub language: String,
    pub publisher: String,
    pub description: String,
    pub identifier: String,
    pub file_size: u64,
    pub added_date: String,
    pub cover_url: Option<String>,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            filename: book.filename.clone(),
            language: book.language.clone(),
            publisher: book.publisher.clone(),
            description: book.description.clone(),
            identifier: book.identifier.clone(),
            file_size: book.file_size,
            added_date: book.added_date.clone(),
            cover_url: book
                .has_cover()
                .then(|| format!("/api/cover/{}", book.id)),
        }
    }
}

//! Turning decoded upload parts into catalog entries.
//!
//! ```text
//! Vec<Part> ──group_parts──▶ Vec<UploadItem { file, metadata?, cover? }>
//!                                   │ per item
//!                                   ▼
//!        generate_id ─▶ write blob ─▶ write cover? ─▶ resolve metadata ─▶ add
//!                                   │ once
//!                                   ▼
//!                            CatalogStore::persist
//! ```
//!
//! Books are numbered by their position among `.epub` file parts. Metadata
//! (`metadata_<i>`) and covers (`cover_<i>`) attach to the book at the same
//! position, whatever order the parts arrived in.

use std::collections::BTreeMap;
use std::time::Instant;

use catalog::{generate_id, Book, CatalogError, CatalogStore};
use serde::Serialize;
use tracing::{debug, info, warn, Level};

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::metadata::{display_filename, UploadMetadata};
use crate::multipart::Part;

/// One book of an upload with whatever metadata and cover belong to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    /// Position among the book file parts.
    pub index: usize,
    pub filename: String,
    pub content: Vec<u8>,
    pub metadata: Option<Vec<u8>>,
    pub cover: Option<Vec<u8>>,
}

/// Summary of one stored book, as returned to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestedBook {
    pub id: String,
    pub title: String,
    pub filename: String,
}

/// Associate book files with their indexed metadata and cover parts.
///
/// Parts that are neither a book, an indexed cover nor indexed metadata are
/// ignored. When an index repeats, the first metadata or cover wins.
pub fn group_parts(parts: Vec<Part>, cfg: &IngestConfig) -> Vec<UploadItem> {
    let mut items = Vec::new();
    let mut metadata: BTreeMap<usize, Vec<u8>> = BTreeMap::new();
    let mut covers: BTreeMap<usize, Vec<u8>> = BTreeMap::new();

    for part in parts {
        match part {
            Part::File {
                field_name,
                filename,
                content,
            } => {
                if cfg.is_book_filename(&filename) {
                    items.push(UploadItem {
                        index: items.len(),
                        filename,
                        content,
                        metadata: None,
                        cover: None,
                    });
                } else if let Some(index) = cfg.cover_index(&field_name) {
                    if covers.contains_key(&index) {
                        debug!(index, "duplicate_cover_ignored");
                    } else {
                        covers.insert(index, content);
                    }
                } else {
                    debug!(field = %field_name, filename = %filename, "unrecognized_file_part");
                }
            }
            Part::Field {
                field_name,
                content,
            } => match cfg.metadata_index(&field_name) {
                Some(index) if !metadata.contains_key(&index) => {
                    metadata.insert(index, content);
                }
                Some(index) => debug!(index, "duplicate_metadata_ignored"),
                None => debug!(field = %field_name, "unrecognized_field_part"),
            },
        }
    }

    for item in &mut items {
        item.metadata = metadata.remove(&item.index);
        item.cover = covers.remove(&item.index).filter(|c| !c.is_empty());
    }
    for index in covers.keys().chain(metadata.keys()) {
        warn!(index, "upload_part_without_book");
    }
    items
}

/// Store every book in `parts` and save the catalog once.
///
/// Fails with [`IngestError::NoFilesUploaded`] when no part is a book file.
/// A book whose metadata or cover is unusable is stored with defaults or
/// without a cover; a book whose blob cannot be written is skipped. The call
/// only fails for I/O when no book could be stored or the snapshot save fails.
pub fn ingest(
    parts: Vec<Part>,
    store: &CatalogStore,
    cfg: &IngestConfig,
) -> Result<Vec<IngestedBook>, IngestError> {
    let start = Instant::now();
    let items = group_parts(parts, cfg);
    if items.is_empty() {
        warn!("ingest_no_books");
        return Err(IngestError::NoFilesUploaded);
    }
    if let Some(limit) = cfg.max_files_per_upload {
        if items.len() > limit {
            return Err(IngestError::TooManyFiles {
                count: items.len(),
                limit,
            });
        }
    }

    let span = tracing::span!(Level::INFO, "ingest.upload", books = items.len());
    let _guard = span.enter();

    let total = items.len();
    let mut stored = Vec::with_capacity(total);
    let mut first_failure = None;
    for item in items {
        let filename = item.filename.clone();
        match ingest_item(item, store, cfg) {
            Ok(book) => stored.push(book),
            Err(err) => {
                warn!(filename = %filename, error = %err, "ingest_book_failed");
                first_failure.get_or_insert(err);
            }
        }
    }

    if stored.is_empty() {
        if let Some(err) = first_failure {
            return Err(err.into());
        }
    }
    store.persist()?;

    info!(
        stored = stored.len(),
        failed = total - stored.len(),
        elapsed_micros = start.elapsed().as_micros(),
        "ingest_success"
    );
    Ok(stored)
}

fn ingest_item(
    item: UploadItem,
    store: &CatalogStore,
    cfg: &IngestConfig,
) -> Result<IngestedBook, CatalogError> {
    let UploadItem {
        index,
        filename,
        content,
        metadata,
        cover,
    } = item;

    let id = generate_id(&content, &filename);
    let file_path = store.write_book_blob(&id, &content)?;
    let existing = store.get_book(&id);

    let cover_path = cover
        .and_then(|bytes| match store.write_cover_blob(&id, &bytes) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(book_id = %id, index, error = %err, "cover_write_failed");
                None
            }
        })
        .or_else(|| existing.as_ref().and_then(|b| b.cover_path.clone()));

    let upload_metadata = match metadata.as_deref().map(UploadMetadata::from_json) {
        Some(Ok(parsed)) => parsed,
        Some(Err(err)) => {
            warn!(book_id = %id, index, error = %err, "metadata_parse_failed");
            UploadMetadata::default()
        }
        None => UploadMetadata::default(),
    };
    let resolved = upload_metadata.resolve(&filename, cfg);

    let added_date = existing
        .as_ref()
        .map(|b| b.added_date.clone())
        .unwrap_or_else(|| catalog::now_millis().to_string());

    let book = Book {
        id: id.clone(),
        title: resolved.title,
        author: resolved.author,
        filename: display_filename(&filename, cfg),
        language: resolved.language,
        publisher: resolved.publisher,
        description: resolved.description,
        identifier: resolved.identifier,
        file_size: content.len() as u64,
        added_date,
        cover_path,
    };
    let summary = IngestedBook {
        id: id.clone(),
        title: book.title.clone(),
        filename: book.filename.clone(),
    };
    store.add(&id, book, file_path);

    info!(
        book_id = %id,
        title = %summary.title,
        bytes = content.len(),
        replaced = existing.is_some(),
        "book_ingested"
    );
    Ok(summary)
}

/// A decoded `/api/upload-cover` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverUpload {
    pub book_id: String,
    pub content: Vec<u8>,
}

impl CoverUpload {
    pub const BOOK_ID_FIELD: &'static str = "bookId";
    pub const COVER_FIELD: &'static str = "cover";

    /// Pick the `bookId` field and the `cover` file out of a decoded form.
    pub fn from_parts(parts: Vec<Part>) -> Result<Self, IngestError> {
        let mut book_id = None;
        let mut content = None;
        for part in parts {
            match part {
                Part::Field {
                    field_name,
                    content: value,
                } if field_name == Self::BOOK_ID_FIELD && book_id.is_none() => {
                    let value = String::from_utf8_lossy(&value).trim().to_string();
                    if !value.is_empty() {
                        book_id = Some(value);
                    }
                }
                Part::File {
                    field_name,
                    content: bytes,
                    ..
                } if field_name == Self::COVER_FIELD && content.is_none() => {
                    if !bytes.is_empty() {
                        content = Some(bytes);
                    }
                }
                _ => {}
            }
        }

        match (book_id, content) {
            (Some(book_id), Some(content)) => Ok(Self { book_id, content }),
            (None, _) => Err(IngestError::MalformedRequest(
                "missing bookId field".into(),
            )),
            (_, None) => Err(IngestError::MalformedRequest("missing cover file".into())),
        }
    }

    /// Write the cover for an existing book and save the catalog.
    pub fn apply(&self, store: &CatalogStore) -> Result<(), IngestError> {
        store.store_cover(&self.book_id, &self.content)?;
        store.persist()?;
        Ok(())
    }
}

//! The catalog store: three in-memory maps mirrored to a JSON snapshot.
//!
//! All state sits behind a single [`RwLock`]. Listing and lookups take the
//! read side; ingestion, progress saves, cover updates, removals and
//! validation take the write side. Snapshot writes go to a temp file that is
//! fsynced and renamed over the live snapshot, so a crash mid-save leaves the
//! previous snapshot intact and readers never observe a half-written file.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::types::{Book, BookSummary, CatalogSnapshot, ReadingProgress};

#[derive(Debug, Default)]
struct CatalogState {
    books: BTreeMap<String, Book>,
    book_files: BTreeMap<String, PathBuf>,
    reading_progress: BTreeMap<String, ReadingProgress>,
}

impl From<CatalogSnapshot> for CatalogState {
    fn from(snapshot: CatalogSnapshot) -> Self {
        Self {
            books: snapshot.books,
            book_files: snapshot.book_files,
            reading_progress: snapshot.reading_progress,
        }
    }
}

impl CatalogState {
    fn remove(&mut self, id: &str) -> bool {
        let book = self.books.remove(id).is_some();
        let file = self.book_files.remove(id).is_some();
        let progress = self.reading_progress.remove(id).is_some();
        book || file || progress
    }
}

/// Borrowed view serialized by `save` without cloning the maps.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    books: &'a BTreeMap<String, Book>,
    book_files: &'a BTreeMap<String, PathBuf>,
    reading_progress: &'a BTreeMap<String, ReadingProgress>,
    saved_at: f64,
}

/// Outcome of a [`CatalogStore::validate`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Books dropped from all maps because their blob is gone or unrecorded.
    pub removed_books: Vec<String>,
    /// `book_files` keys that had no book.
    pub orphaned_files: Vec<String>,
    /// `reading_progress` keys that had no book.
    pub orphaned_progress: Vec<String>,
    /// Books whose `coverPath` pointed at a missing file.
    pub cleared_covers: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.removed_books.is_empty()
            && self.orphaned_files.is_empty()
            && self.orphaned_progress.is_empty()
            && self.cleared_covers.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub books_count: usize,
    pub progress_count: usize,
    pub files_count: usize,
}

/// Owned catalog handle. Construct once per process and share it (`Arc`).
#[derive(Debug)]
pub struct CatalogStore {
    config: CatalogConfig,
    state: RwLock<CatalogState>,
    save_lock: Mutex<()>,
}

impl CatalogStore {
    /// Validate `config`, create the blob directories and load the snapshot.
    pub fn open(config: CatalogConfig) -> Result<Self, CatalogError> {
        config.validate()?;
        for dir in [&config.books_dir, &config.covers_dir] {
            fs::create_dir_all(dir).map_err(|e| CatalogError::io("create", dir, e))?;
        }
        if let Some(parent) = non_empty_parent(&config.data_file) {
            fs::create_dir_all(parent).map_err(|e| CatalogError::io("create", parent, e))?;
        }

        let store = Self {
            config,
            state: RwLock::new(CatalogState::default()),
            save_lock: Mutex::new(()),
        };
        store.load();
        Ok(store)
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the in-memory maps with the snapshot on disk.
    ///
    /// A missing file means an empty library. An unreadable or unparseable
    /// file also yields an empty library, never a partial one; the bad file
    /// is moved aside to `<data_file>.corrupt` so the next save cannot
    /// overwrite what is left of it.
    pub fn load(&self) {
        let path = &self.config.data_file;
        let snapshot = match fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<CatalogSnapshot>(&bytes) {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "catalog_snapshot_corrupt");
                    self.quarantine_snapshot();
                    None
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "catalog_snapshot_absent");
                None
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "catalog_snapshot_unreadable");
                None
            }
        };

        let mut state = self.write();
        *state = snapshot.map(CatalogState::from).unwrap_or_default();
        info!(
            books = state.books.len(),
            progress = state.reading_progress.len(),
            "catalog_loaded"
        );
    }

    /// Discard in-memory state and load the snapshot again.
    pub fn reload(&self) {
        info!("catalog_reload");
        self.load();
    }

    fn quarantine_snapshot(&self) {
        let path = &self.config.data_file;
        let mut aside = path.as_os_str().to_owned();
        aside.push(".corrupt");
        if let Err(err) = fs::rename(path, &aside) {
            warn!(path = %path.display(), error = %err, "catalog_snapshot_quarantine_failed");
        }
    }

    /// Write the snapshot, reporting failure as `false`.
    pub fn save(&self) -> bool {
        match self.persist() {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "snapshot_save_failed");
                false
            }
        }
    }

    /// Write the snapshot atomically: serialize under the read lock, write and
    /// fsync `<data_file>.tmp`, then rename it over `data_file`.
    pub fn persist(&self) -> Result<(), CatalogError> {
        let start = Instant::now();
        let _saving = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (json, books) = {
            let state = self.read();
            let snapshot = SnapshotRef {
                books: &state.books,
                book_files: &state.book_files,
                reading_progress: &state.reading_progress,
                saved_at: crate::now_millis() as f64 / 1000.0,
            };
            (serde_json::to_vec_pretty(&snapshot)?, state.books.len())
        };

        let path = &self.config.data_file;
        let tmp = self.config.temp_data_file();
        write_synced(&tmp, &json).map_err(|e| CatalogError::io("write", &tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| CatalogError::io("rename", &tmp, e))?;

        info!(
            path = %path.display(),
            books,
            bytes = json.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "snapshot_saved"
        );
        Ok(())
    }

    /// Self-healing pass over the maps and the filesystem.
    ///
    /// Books whose blob is missing (or never recorded) are removed from all
    /// three maps; file and progress entries without a book are pruned;
    /// cover paths that no longer resolve are cleared.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        let mut state = self.write();

        report.removed_books = state
            .books
            .keys()
            .filter(|id| {
                state
                    .book_files
                    .get(*id)
                    .is_none_or(|path| !path.exists())
            })
            .cloned()
            .collect();
        for id in &report.removed_books {
            warn!(book_id = %id, path = ?state.book_files.get(id), "book_file_missing");
            state.remove(id);
        }

        let CatalogState {
            books,
            book_files,
            reading_progress,
        } = &mut *state;

        book_files.retain(|id, _| {
            let keep = books.contains_key(id);
            if !keep {
                report.orphaned_files.push(id.clone());
            }
            keep
        });
        reading_progress.retain(|id, _| {
            let keep = books.contains_key(id);
            if !keep {
                report.orphaned_progress.push(id.clone());
            }
            keep
        });
        for (id, book) in books.iter_mut() {
            if book.cover_path.as_deref().is_some_and(|p| !p.exists()) {
                book.cover_path = None;
                report.cleared_covers.push(id.clone());
            }
        }

        if report.is_clean() {
            debug!(books = books.len(), "catalog_validated");
        } else {
            info!(
                removed_books = report.removed_books.len(),
                orphaned_files = report.orphaned_files.len(),
                orphaned_progress = report.orphaned_progress.len(),
                cleared_covers = report.cleared_covers.len(),
                "catalog_repaired"
            );
        }
        report
    }

    /// Insert or replace a book and the path of its blob.
    pub fn add(&self, id: impl Into<String>, mut book: Book, file_path: impl Into<PathBuf>) {
        let id = id.into();
        book.id.clone_from(&id);
        let mut state = self.write();
        state.books.insert(id.clone(), book);
        state.book_files.insert(id.clone(), file_path.into());
        debug!(book_id = %id, "book_added");
    }

    /// Remove a book from all three maps. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.write().remove(id);
        if removed {
            info!(book_id = %id, "book_removed");
        }
        removed
    }

    /// [`remove`](Self::remove), then delete the book's blob and cover from
    /// disk. File deletion is best effort.
    pub fn remove_with_files(&self, id: &str) -> bool {
        let (removed, paths) = {
            let mut state = self.write();
            let mut paths: Vec<PathBuf> = Vec::with_capacity(2);
            paths.extend(state.book_files.get(id).cloned());
            paths.extend(state.books.get(id).and_then(|b| b.cover_path.clone()));
            (state.remove(id), paths)
        };
        for path in paths {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "blob_deleted"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!(path = %path.display(), error = %err, "blob_delete_failed"),
            }
        }
        if removed {
            info!(book_id = %id, "book_removed");
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().books.contains_key(id)
    }

    pub fn get_book(&self, id: &str) -> Option<Book> {
        self.read().books.get(id).cloned()
    }

    pub fn book_file_path(&self, id: &str) -> Option<PathBuf> {
        self.read().book_files.get(id).cloned()
    }

    pub fn cover_path(&self, id: &str) -> Option<PathBuf> {
        self.read().books.get(id).and_then(|b| b.cover_path.clone())
    }

    /// Listing projection, newest first (ties broken by id).
    pub fn list_books(&self) -> Vec<BookSummary> {
        let state = self.read();
        let mut books: Vec<&Book> = state.books.values().collect();
        books.sort_by(|a, b| {
            b.added_millis()
                .cmp(&a.added_millis())
                .then_with(|| a.id.cmp(&b.id))
        });
        books.into_iter().map(BookSummary::from).collect()
    }

    pub fn get_progress(&self, id: &str) -> Option<ReadingProgress> {
        self.read().reading_progress.get(id).cloned()
    }

    /// Insert or replace the progress record of `id` as given.
    pub fn set_progress(&self, id: impl Into<String>, record: ReadingProgress) {
        let id = id.into();
        debug!(book_id = %id, percentage = record.percentage, "progress_set");
        self.write().reading_progress.insert(id, record);
    }

    /// Build and store a progress record stamped now.
    ///
    /// `percentage` is clamped into `[0, 1]` (NaN becomes 0) and the timestamp
    /// never goes backwards relative to the previous record of the same book.
    pub fn record_progress(
        &self,
        id: &str,
        cfi: String,
        percentage: f64,
        chapter_title: String,
    ) -> ReadingProgress {
        let percentage = if percentage.is_nan() {
            0.0
        } else {
            percentage.clamp(0.0, 1.0)
        };
        let mut state = self.write();
        let previous = state.reading_progress.get(id).map_or(i64::MIN, |p| p.timestamp);
        let record = ReadingProgress {
            cfi,
            percentage,
            chapter_title,
            timestamp: crate::now_millis().max(previous),
        };
        state.reading_progress.insert(id.to_string(), record.clone());
        debug!(book_id = %id, percentage, "progress_recorded");
        record
    }

    pub fn remove_progress(&self, id: &str) -> bool {
        let removed = self.write().reading_progress.remove(id).is_some();
        if removed {
            debug!(book_id = %id, "progress_removed");
        }
        removed
    }

    pub fn stats(&self) -> CatalogStats {
        let state = self.read();
        CatalogStats {
            books_count: state.books.len(),
            progress_count: state.reading_progress.len(),
            files_count: state.book_files.len(),
        }
    }

    /// Write an EPUB blob to its content-addressed path.
    ///
    /// An existing file of the same length is left alone: with a
    /// content-addressed name it already holds these bytes.
    pub fn write_book_blob(&self, id: &str, content: &[u8]) -> Result<PathBuf, CatalogError> {
        let path = self.config.book_path(id);
        write_blob(&path, content)?;
        Ok(path)
    }

    /// Write a cover image to the path derived from the book id.
    ///
    /// The name is not derived from the image bytes, so the file is always
    /// rewritten.
    pub fn write_cover_blob(&self, id: &str, content: &[u8]) -> Result<PathBuf, CatalogError> {
        let path = self.config.cover_path(id);
        write_file(&path, content)?;
        Ok(path)
    }

    /// Store a cover for an existing book and record its path.
    pub fn store_cover(&self, id: &str, content: &[u8]) -> Result<PathBuf, CatalogError> {
        if !self.contains(id) {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        let path = self.write_cover_blob(id, content)?;

        let mut state = self.write();
        match state.books.get_mut(id) {
            Some(book) => {
                book.cover_path = Some(path.clone());
                info!(book_id = %id, bytes = content.len(), "cover_stored");
                Ok(path)
            }
            // Removed while the cover was being written.
            None => Err(CatalogError::NotFound(id.to_string())),
        }
    }
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn write_file(path: &Path, content: &[u8]) -> Result<(), CatalogError> {
    if let Some(parent) = non_empty_parent(path) {
        fs::create_dir_all(parent).map_err(|e| CatalogError::io("create", parent, e))?;
    }
    fs::write(path, content).map_err(|e| CatalogError::io("write", path, e))
}

fn write_blob(path: &Path, content: &[u8]) -> Result<(), CatalogError> {
    if let Ok(meta) = fs::metadata(path) {
        if meta.is_file() && meta.len() == content.len() as u64 {
            debug!(path = %path.display(), "blob_exists");
            return Ok(());
        }
    }
    write_file(path, content)
}

//! Storage layout of the catalog.
//!
//! [`CatalogConfig`] names the three places the catalog touches on disk: the
//! JSON snapshot file, the directory of `.epub` blobs and the directory of
//! `.jpg` covers. Both blob directories are content-addressed: files are named
//! after the book id, never after the uploaded filename.
//!
//! ```rust
//! use catalog::CatalogConfig;
//!
//! let config = CatalogConfig::rooted_at("/srv/shelf");
//! assert!(config.validate().is_ok());
//! assert!(config.data_file.ends_with("books_data.json"));
//! ```
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Paths used by [`crate::CatalogStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON snapshot file.
    ///
    /// Default: `books_data.json`
    pub data_file: PathBuf,

    /// Directory holding `<id>.epub` blobs.
    ///
    /// Default: `books`
    pub books_dir: PathBuf,

    /// Directory holding `<id>.jpg` covers.
    ///
    /// Default: `covers`
    pub covers_dir: PathBuf,
}

/// Invalid catalog configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required path was left empty.
    #[error("{0} must not be empty")]
    EmptyPath(&'static str),

    /// Books and covers share a directory, so `<id>.*` blobs could shadow each other
    /// during orphan cleanup.
    #[error("books_dir and covers_dir must differ (both are {0})")]
    SharedBlobDir(String),
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("books_data.json"),
            books_dir: PathBuf::from("books"),
            covers_dir: PathBuf::from("covers"),
        }
    }
}

impl CatalogConfig {
    /// Default layout placed under `root`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let defaults = Self::default();
        Self {
            data_file: root.join(defaults.data_file),
            books_dir: root.join(defaults.books_dir),
            covers_dir: root.join(defaults.covers_dir),
        }
    }

    /// Content-addressed location of a book blob.
    pub fn book_path(&self, id: &str) -> PathBuf {
        self.books_dir.join(format!("{id}.epub"))
    }

    /// Content-addressed location of a cover image.
    pub fn cover_path(&self, id: &str) -> PathBuf {
        self.covers_dir.join(format!("{id}.jpg"))
    }

    /// Temp file the snapshot is written to before being renamed into place.
    pub fn temp_data_file(&self) -> PathBuf {
        let mut name = self.data_file.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, path) in [
            ("data_file", &self.data_file),
            ("books_dir", &self.books_dir),
            ("covers_dir", &self.covers_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyPath(name));
            }
        }
        if self.books_dir == self.covers_dir {
            return Err(ConfigError::SharedBlobDir(
                self.books_dir.display().to_string(),
            ));
        }
        Ok(())
    }
}

//! Configuration for upload ingestion.
//!
//! [`IngestConfig`] names the form conventions the browser client uses
//! (`files`, `metadata_<i>`, `cover_<i>`) and the defaults applied when a
//! book arrives without usable metadata.
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("defaults are valid");
//! assert_eq!(config.cover_index("cover_3"), Some(3));
//! assert_eq!(config.metadata_index("metadata_x"), None);
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// File parts whose filename ends with this (ASCII case-insensitive) are books.
    ///
    /// Default: `".epub"`
    pub book_extension: String,

    /// Field parts named `<prefix><index>` carry the JSON metadata of book `index`.
    ///
    /// Default: `"metadata_"`
    pub metadata_field_prefix: String,

    /// File parts named `<prefix><index>` carry the cover of book `index`.
    ///
    /// Default: `"cover_"`
    pub cover_field_prefix: String,

    /// Default: `"Unknown Author"`
    pub default_author: String,

    /// Default: `"unknown"`
    pub default_language: String,

    /// Default: `"Unknown Publisher"`
    pub default_publisher: String,

    /// Strip control characters from single-line metadata (title, author,
    /// language, publisher, identifier, filename) before storing it.
    ///
    /// Default: `true`
    pub strip_control_chars: bool,

    /// Upper bound on books per upload request. `None` means unlimited.
    ///
    /// Default: `None`
    pub max_files_per_upload: Option<usize>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("metadata and cover field prefixes must differ (both are {0:?})")]
    PrefixClash(String),

    #[error("max_files_per_upload must be at least 1")]
    ZeroFileLimit,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            book_extension: ".epub".to_string(),
            metadata_field_prefix: "metadata_".to_string(),
            cover_field_prefix: "cover_".to_string(),
            default_author: "Unknown Author".to_string(),
            default_language: "unknown".to_string(),
            default_publisher: "Unknown Publisher".to_string(),
            strip_control_chars: true,
            max_files_per_upload: None,
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("book_extension", &self.book_extension),
            ("metadata_field_prefix", &self.metadata_field_prefix),
            ("cover_field_prefix", &self.cover_field_prefix),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Empty(name));
            }
        }
        if self.metadata_field_prefix == self.cover_field_prefix {
            return Err(ConfigError::PrefixClash(self.cover_field_prefix.clone()));
        }
        if self.max_files_per_upload == Some(0) {
            return Err(ConfigError::ZeroFileLimit);
        }
        Ok(())
    }

    pub fn is_book_filename(&self, filename: &str) -> bool {
        let ext = self.book_extension.as_bytes();
        let name = filename.as_bytes();
        name.len() >= ext.len() && name[name.len() - ext.len()..].eq_ignore_ascii_case(ext)
    }

    pub fn metadata_index(&self, field_name: &str) -> Option<usize> {
        indexed(field_name, &self.metadata_field_prefix)
    }

    pub fn cover_index(&self, field_name: &str) -> Option<usize> {
        indexed(field_name, &self.cover_field_prefix)
    }
}

/// `<prefix><digits>` -> digits as an index.
fn indexed(field_name: &str, prefix: &str) -> Option<usize> {
    let digits = field_name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

//! Per-book metadata sent alongside an upload.
//!
//! The browser client extracts metadata from the EPUB itself and sends it as
//! a JSON blob in the `metadata_<i>` field:
//!
//! ```json
//! {"title": "Dune", "creator": "Frank Herbert", "language": "en",
//!  "publisher": "Chilton", "identifier": "isbn:...", "description": "..."}
//! ```
//!
//! Every field is optional and unknown fields are ignored. Blank values count
//! as absent, so each field falls back to its default independently.

use std::path::Path;

use serde::Deserialize;

use crate::config::IngestConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "author")]
    pub creator: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Metadata after defaults and sanitization, ready to become a `Book`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub title: String,
    pub author: String,
    pub language: String,
    pub publisher: String,
    pub identifier: String,
    pub description: String,
}

impl UploadMetadata {
    pub fn from_json(blob: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(blob)
    }

    pub fn resolve(self, filename: &str, cfg: &IngestConfig) -> ResolvedMetadata {
        let strip = cfg.strip_control_chars;
        ResolvedMetadata {
            title: sanitize_optional_string(self.title, strip)
                .unwrap_or_else(|| title_from_filename(filename, cfg)),
            author: sanitize_optional_string(self.creator, strip)
                .unwrap_or_else(|| cfg.default_author.clone()),
            language: sanitize_optional_string(self.language, strip)
                .unwrap_or_else(|| cfg.default_language.clone()),
            publisher: sanitize_optional_string(self.publisher, strip)
                .unwrap_or_else(|| cfg.default_publisher.clone()),
            identifier: sanitize_optional_string(self.identifier, strip).unwrap_or_default(),
            description: sanitize_optional_string(self.description, false).unwrap_or_default(),
        }
    }
}

/// Last path component of an uploaded filename. Some clients send a full
/// client-side path; only the final name is worth keeping.
pub fn display_filename(filename: &str, cfg: &IngestConfig) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    sanitize_optional_string(Some(name.to_string()), cfg.strip_control_chars)
        .unwrap_or_else(|| filename.to_string())
}

/// Filename with the book extension removed, e.g. `Dune.epub` -> `Dune`.
pub fn title_from_filename(filename: &str, cfg: &IngestConfig) -> String {
    let name = display_filename(filename, cfg);
    let stem = if cfg.is_book_filename(&name) {
        &name[..name.len() - cfg.book_extension.len()]
    } else {
        Path::new(&name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&name)
    };
    let stem = stem.trim();
    if stem.is_empty() {
        name
    } else {
        stem.to_string()
    }
}

/// Trim, optionally strip control characters, and map empty to `None`.
pub(crate) fn sanitize_optional_string(value: Option<String>, strip_control: bool) -> Option<String> {
    value.and_then(|raw| {
        let filtered = if strip_control {
            raw.chars().filter(|c| !c.is_control()).collect::<String>()
        } else {
            raw
        };
        let trimmed = filtered.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

//! Error types produced by the catalog crate.
//!
//! | Error | Meaning | HTTP |
//! |-------|---------|------|
//! | [`NotFound`](CatalogError::NotFound) | unknown book id or missing backing file | 404 |
//! | [`Persistence`](CatalogError::Persistence) | blob or snapshot write failed | 500 |
//! | [`Serialization`](CatalogError::Serialization) | snapshot could not be encoded | 500 |
//! | [`InvalidConfig`](CatalogError::InvalidConfig) | bad [`crate::CatalogConfig`] at open | startup |
//!
//! A corrupt snapshot on load is not an error at all: the store logs it and
//! starts from an empty catalog.
use std::path::Path;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("book not found: {0}")]
    NotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("snapshot serialization failed: {0}")]
    Serialization(String),

    #[error("invalid catalog configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl CatalogError {
    pub(crate) fn io(action: &str, path: &Path, err: std::io::Error) -> Self {
        CatalogError::Persistence(format!("{action} {}: {err}", path.display()))
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Serialization(err.to_string())
    }
}

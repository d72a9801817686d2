use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use catalog::CatalogError;
use ingest::IngestError;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Ingest(#[from] IngestError),

    #[error("{0}")]
    Catalog(#[from] CatalogError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Ingest(IngestError::Catalog(err)) | ServerError::Catalog(err) => {
                catalog_status(err)
            }
            ServerError::Ingest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) | ServerError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::Ingest(IngestError::NoFilesUploaded) => "NO_FILES_UPLOADED",
            ServerError::Ingest(IngestError::TooManyFiles { .. }) => "TOO_MANY_FILES",
            ServerError::Ingest(IngestError::Catalog(err)) | ServerError::Catalog(err) => {
                catalog_code(err)
            }
            ServerError::Ingest(_) => "MALFORMED_REQUEST",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
        }
    }
}

fn catalog_status(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn catalog_code(err: &CatalogError) -> &'static str {
    match err {
        CatalogError::NotFound(_) => "NOT_FOUND",
        CatalogError::Persistence(_) => "PERSISTENCE_FAILURE",
        CatalogError::Serialization(_) => "SERIALIZATION_ERROR",
        _ => "CATALOG_ERROR",
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code().to_string();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code = %error_code, error = %message, "request_failed");
        } else {
            tracing::debug!(code = %error_code, error = %message, "request_rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
            },
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("background task failed: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServerError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(IngestError::NoFilesUploaded).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(IngestError::MalformedRequest("boundary".into())).error_code(),
            "MALFORMED_REQUEST"
        );
        assert_eq!(
            ServerError::from(IngestError::Catalog(CatalogError::NotFound("b".into())))
                .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::from(CatalogError::Persistence("disk full".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::from(CatalogError::Persistence("disk full".into())).error_code(),
            "PERSISTENCE_FAILURE"
        );
    }

    #[test]
    fn test_json_errors_are_bad_requests() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(ServerError::from(err).status_code(), StatusCode::BAD_REQUEST);
    }
}

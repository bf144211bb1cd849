//! Error types and error handling for the services
//!
//! This module defines the error taxonomy shared by the feed and image services.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Request-level failures surface as an HTTP response. Per-record and per-image
/// failures (`DecodeFailed`, skipped records) are absorbed by the pipelines and only
/// reach a response as part of the `skipped` report.
#[derive(Error, Debug)]
pub enum AppError {
    /// Multipart request carried no `file` field
    #[error("No file part in the request")]
    NoFileProvided,

    /// Multipart `file` field had a blank filename
    #[error("No selected file")]
    EmptyFilename,

    /// Form carried no `url` field (or it was blank)
    #[error("No URL provided")]
    NoUrlProvided,

    /// Request input was present but unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Remote fetch failed at the transport level or returned a non-2xx status
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed {
        /// URL that was requested
        url: String,
        /// Underlying transport error or HTTP status
        reason: String,
    },

    /// Bytes were not well-formed XML
    #[error("Failed to parse XML: {0}")]
    ParseFailed(String),

    /// Image bytes could not be decoded or re-encoded
    #[error("Failed to decode image {filename}: {reason}")]
    DecodeFailed {
        /// Original filename of the image
        filename: String,
        /// Underlying codec error
        reason: String,
    },

    /// Nothing was available to archive
    #[error("No compressed files to download")]
    EmptyBatch,

    /// Writing the archive failed
    #[error("Failed to write archive: {0}")]
    ArchiveWriteFailed(String),

    /// Expected working-storage directory is absent
    #[error("Storage missing: {0}")]
    StorageMissing(String),

    /// Requested artifact does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Path is invalid (e.g., contains separators or parent components)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Working-storage I/O failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NoFileProvided
            | AppError::EmptyFilename
            | AppError::NoUrlProvided
            | AppError::InvalidInput(_)
            | AppError::EmptyBatch
            | AppError::StorageMissing(_)
            | AppError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            AppError::DecodeFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::FileNotFound(_) => StatusCode::NOT_FOUND,
            AppError::FetchFailed { .. }
            | AppError::ParseFailed(_)
            | AppError::ArchiveWriteFailed(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable reason code included in error bodies
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::NoFileProvided | AppError::EmptyFilename | AppError::NoUrlProvided => {
                "input_missing"
            }
            AppError::InvalidInput(_) => "invalid_input",
            AppError::FetchFailed { .. } => "fetch_failed",
            AppError::ParseFailed(_) => "parse_failed",
            AppError::DecodeFailed { .. } => "decode_failed",
            AppError::EmptyBatch => "empty_batch",
            AppError::ArchiveWriteFailed(_) => "archive_write_failed",
            AppError::StorageMissing(_) => "storage_missing",
            AppError::FileNotFound(_) => "not_found",
            AppError::InvalidPath(_) => "invalid_path",
            AppError::Storage(_) => "storage_error",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "reason": self.reason(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_missing_maps_to_bad_request() {
        for error in [
            AppError::NoFileProvided,
            AppError::EmptyFilename,
            AppError::NoUrlProvided,
        ] {
            assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
            assert_eq!(error.reason(), "input_missing");
        }
    }

    #[test]
    fn test_fetch_failed_maps_to_server_error() {
        let error = AppError::FetchFailed {
            url: "http://example.com/feed.xml".to_string(),
            reason: "HTTP 404".to_string(),
        };
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.reason(), "fetch_failed");
        assert!(error.to_string().contains("http://example.com/feed.xml"));
    }

    #[test]
    fn test_empty_batch_and_missing_storage_are_client_errors() {
        assert_eq!(AppError::EmptyBatch.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::StorageMissing("outbound".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ArchiveWriteFailed("disk full".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = AppError::FileNotFound("converted.xml".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("Body is not JSON");
        assert_eq!(body["reason"], "not_found");
        assert_eq!(body["status"], 404);
        assert!(body["error"].as_str().unwrap().contains("converted.xml"));
    }
}

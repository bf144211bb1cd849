//! Feed service API handlers
//!
//! Upload or fetch a catalog, then download the generated feed.

use crate::error::AppError;
use crate::feed::SkippedRecord;
use crate::services::feed::TransformOutcome;
use crate::services::{FeedService, UploadedFile};
use axum::{
    extract::{rejection::FormRejection, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Json, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Response for a successful transformation
#[derive(Debug, Serialize)]
pub struct TransformResponse {
    /// Human-readable message
    pub message: String,
    /// Where to download the generated feed
    pub download_url: String,
    /// Number of items in the feed
    pub items: usize,
    /// Records left out of the feed
    pub skipped: Vec<SkippedRecord>,
}

impl From<TransformOutcome> for TransformResponse {
    fn from(outcome: TransformOutcome) -> Self {
        Self {
            message: "File transformed successfully!".to_string(),
            download_url: format!("/download/{}", outcome.filename),
            items: outcome.items,
            skipped: outcome.skipped,
        }
    }
}

/// Form body for `/fetch`
#[derive(Debug, Deserialize)]
pub struct FetchForm {
    /// Catalog URL
    pub url: Option<String>,
}

/// POST /upload - Transform an uploaded catalog file
pub async fn upload_catalog(
    State(service): State<Arc<FeedService>>,
    mut multipart: Multipart,
) -> Result<Json<TransformResponse>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" if upload.is_none() => {
                let filename = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;
                upload = Some(UploadedFile::new(filename, bytes.to_vec()));
            }
            _ => {
                warn!("Ignoring multipart field: {}", field_name);
            }
        }
    }

    let outcome = service.transform_upload(upload).await?;
    Ok(Json(outcome.into()))
}

/// POST /fetch - Fetch a catalog from a URL and transform it
///
/// A request without a urlencoded body carries no `url` field.
pub async fn fetch_catalog(
    State(service): State<Arc<FeedService>>,
    form: Result<Form<FetchForm>, FormRejection>,
) -> Result<Json<TransformResponse>, AppError> {
    let url = match form {
        Ok(Form(form)) => form.url,
        Err(FormRejection::InvalidFormContentType(_)) => None,
        Err(rejection) => {
            return Err(AppError::InvalidInput(format!(
                "Failed to read form: {}",
                rejection.body_text()
            )))
        }
    };

    let outcome = service.transform_url(url.as_deref()).await?;
    Ok(Json(outcome.into()))
}

/// GET /download/:filename - Download a generated feed
pub async fn download_feed(
    State(service): State<Arc<FeedService>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let path = service.artifact(&filename).await?;
    let bytes = tokio::fs::read(&path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/xml".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

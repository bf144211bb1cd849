//! Image service API handlers
//!
//! Upload a batch of images for recompression, then download the archive.
//! Downloading purges the batch from working storage.

use crate::error::AppError;
use crate::images::Quality;
use crate::services::batch::{ArchiveHandoff, SkippedImage, ARCHIVE_FILENAME};
use crate::services::{ImageBatchService, UploadedFile};
use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Response for an uploaded batch
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    /// Human-readable message
    pub message: String,
    /// Where to download the archive
    pub download_url: String,
    /// Batch token
    pub batch: String,
    /// Filenames that were compressed
    pub compressed: Vec<String>,
    /// Images that failed
    pub skipped: Vec<SkippedImage>,
}

/// POST /upload - Compress a batch of images
///
/// Accepts multipart form data with:
/// - images: one or more image files
/// - quality: optional JPEG quality (0-100)
pub async fn upload_images(
    State(service): State<Arc<ImageBatchService>>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, AppError> {
    let mut files = Vec::new();
    let mut quality = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "images" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read image data: {}", e))
                })?;
                files.push(UploadedFile::new(filename, bytes.to_vec()));
            }
            "quality" => {
                let text = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read quality field: {}", e))
                })?;
                if !text.trim().is_empty() {
                    quality = Some(Quality::parse(&text)?);
                }
            }
            _ => {
                warn!("Ignoring multipart field: {}", field_name);
            }
        }
    }

    let report = service.ingest(files, quality).await?;
    let message = if report.skipped.is_empty() {
        "Images compressed successfully!".to_string()
    } else {
        format!(
            "Compressed {} image(s), skipped {}",
            report.compressed.len(),
            report.skipped.len()
        )
    };

    Ok(Json(BatchResponse {
        message,
        download_url: format!("/download/{}", report.batch),
        batch: report.batch.to_string(),
        compressed: report.compressed,
        skipped: report.skipped,
    }))
}

/// GET /download - Download the archive of the most recent batch
pub async fn download_latest(
    State(service): State<Arc<ImageBatchService>>,
) -> Result<Response, AppError> {
    let handoff = service.download_latest().await?;
    Ok(archive_response(handoff))
}

/// GET /download/:batch - Download the archive of a specific batch
pub async fn download_batch(
    State(service): State<Arc<ImageBatchService>>,
    Path(batch): Path<String>,
) -> Result<Response, AppError> {
    let batch = Uuid::parse_str(&batch)
        .map_err(|_| AppError::InvalidPath(format!("Invalid batch id: {}", batch)))?;
    let handoff = service.download(batch).await?;
    Ok(archive_response(handoff))
}

fn archive_response(handoff: ArchiveHandoff) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", ARCHIVE_FILENAME),
            ),
        ],
        handoff.bytes,
    )
        .into_response()
}

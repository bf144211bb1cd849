//! Image batch service
//!
//! Owns the working-storage lifecycle of an image batch: uploads land in the
//! batch's inbound scope and are dropped once compressed, compressed files wait
//! in its outbound scope until the archive has been handed off. Batches that are
//! never downloaded are purged once newer batches push them out of retention.

use super::source::UploadedFile;
use super::storage::{sanitize_filename, RetainedScopes, ScopeId, WorkingStorage};
use crate::config::DEFAULT_RETENTION;
use crate::error::AppError;
use crate::images::{archiver, compress, Quality};
use anyhow::anyhow;
use serde::Serialize;
use tracing::{error, info, warn};

/// Filename offered to clients for every archive
pub const ARCHIVE_FILENAME: &str = "compressed_images.zip";

/// An image that was left out of the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedImage {
    /// Client-supplied filename
    pub filename: String,
    /// Why it was skipped
    pub reason: String,
}

/// Result of ingesting one batch
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Scope token identifying the batch
    pub batch: ScopeId,
    /// Filenames that were compressed, in upload order
    pub compressed: Vec<String>,
    /// Images that failed, in upload order
    pub skipped: Vec<SkippedImage>,
}

/// An archive ready to hand off to a client
#[derive(Debug, Clone)]
pub struct ArchiveHandoff {
    /// Zip bytes
    pub bytes: Vec<u8>,
    /// Number of entries in the archive
    pub entries: usize,
}

/// Compress-then-archive-then-cleanup pipeline
#[derive(Debug)]
pub struct ImageBatchService {
    storage: WorkingStorage,
    default_quality: Quality,
    pending: RetainedScopes,
}

impl ImageBatchService {
    /// Create a service
    pub fn new(storage: WorkingStorage, default_quality: Quality) -> Self {
        Self {
            storage,
            default_quality,
            pending: RetainedScopes::new(DEFAULT_RETENTION),
        }
    }

    /// Keep at most `limit` batches awaiting download
    pub fn with_retention(mut self, limit: usize) -> Self {
        self.pending = RetainedScopes::new(limit);
        self
    }

    /// Working storage used by this service
    pub fn storage(&self) -> &WorkingStorage {
        &self.storage
    }

    /// The most recently ingested batch that has not been downloaded yet
    pub async fn latest_batch(&self) -> Option<ScopeId> {
        self.pending.newest().await
    }

    /// Compress a batch of uploaded images
    ///
    /// Files with a blank filename are ignored. A file that cannot be decoded is
    /// reported in `skipped` and does not affect the rest of the batch.
    ///
    /// # Returns
    /// * `Ok(BatchReport)` - Per-file outcome of the batch
    /// * `Err(AppError::NoFileProvided)` - If no usable file was uploaded
    pub async fn ingest(
        &self,
        files: Vec<UploadedFile>,
        quality: Option<Quality>,
    ) -> Result<BatchReport, AppError> {
        let files: Vec<_> = files
            .into_iter()
            .filter(|f| !f.filename.trim().is_empty())
            .collect();
        if files.is_empty() {
            return Err(AppError::NoFileProvided);
        }

        let quality = quality.unwrap_or(self.default_quality);
        let batch = self.storage.open_scope();
        self.storage.prepare_scope(batch).await?;
        let mut compressed = Vec::new();
        let mut skipped = Vec::new();

        info!(
            batch = %batch,
            files = files.len(),
            quality = quality.value(),
            "Compressing image batch"
        );

        for file in files {
            match self.process(batch, file.filename.clone(), file.bytes, quality).await {
                Ok(name) => compressed.push(name),
                Err(e) => {
                    warn!(batch = %batch, filename = %file.filename, error = %e, "Skipping image");
                    skipped.push(SkippedImage {
                        filename: file.filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if let Err(e) = self.storage.release_inbound(batch).await {
            warn!(batch = %batch, error = %e, "Failed to clean up inbound images");
        }
        for evicted in self.pending.admit(batch).await {
            match self.storage.release(evicted).await {
                Ok(()) => info!(batch = %evicted, "Expired undownloaded batch"),
                Err(e) => warn!(batch = %evicted, error = %e, "Failed to expire batch"),
            }
        }

        info!(
            batch = %batch,
            compressed = compressed.len(),
            skipped = skipped.len(),
            "Image batch processed"
        );

        Ok(BatchReport {
            batch,
            compressed,
            skipped,
        })
    }

    async fn process(
        &self,
        batch: ScopeId,
        filename: String,
        bytes: Vec<u8>,
        quality: Quality,
    ) -> Result<String, AppError> {
        let name = sanitize_filename(&filename)?.to_string();
        self.storage.save_inbound(batch, &name, &bytes).await?;

        let task_name = name.clone();
        let image = tokio::task::spawn_blocking(move || compress(&task_name, &bytes, quality))
            .await
            .map_err(|e| AppError::Internal(anyhow!("Compression task failed: {}", e)))??;

        self.storage
            .write_outbound(batch, &image.filename, &image.bytes)
            .await?;
        Ok(name)
    }

    /// Build the archive for a batch and hand it off
    ///
    /// After the archive bytes are in hand, the batch's inbound and outbound
    /// storage are purged. A batch with nothing to archive is purged as well;
    /// any other failure leaves it in place.
    ///
    /// # Returns
    /// * `Ok(ArchiveHandoff)` - The archive
    /// * `Err(AppError::StorageMissing)` - If the batch has no outbound folder
    /// * `Err(AppError::EmptyBatch)` - If the batch has no compressed files
    /// * `Err(AppError::ArchiveWriteFailed)` - If the archive could not be written
    pub async fn download(&self, batch: ScopeId) -> Result<ArchiveHandoff, AppError> {
        let dir = self.storage.outbound_dir(batch);
        let dest = self.storage.archive_path(batch);

        let built = tokio::task::spawn_blocking(move || {
            let entries = archiver::collect_entries(&dir)?;
            archiver::write_archive(&entries, &dest)
        })
        .await
        .map_err(|e| AppError::Internal(anyhow!("Archive task failed: {}", e)))?;

        let entries = match built {
            Ok(entries) => entries,
            Err(AppError::EmptyBatch) => {
                warn!(batch = %batch, "Batch has no compressed files");
                self.release(batch).await?;
                return Err(AppError::EmptyBatch);
            }
            Err(e) => {
                error!(batch = %batch, error = %e, "Failed to build archive");
                return Err(e);
            }
        };

        let bytes = tokio::fs::read(self.storage.archive_path(batch))
            .await
            .map_err(|e| AppError::ArchiveWriteFailed(e.to_string()))?;

        self.release(batch).await?;

        info!(batch = %batch, entries, bytes = bytes.len(), "Archive handed off");
        Ok(ArchiveHandoff { bytes, entries })
    }

    /// Build and hand off the archive of the most recent batch
    pub async fn download_latest(&self) -> Result<ArchiveHandoff, AppError> {
        let batch = self.latest_batch().await.ok_or_else(|| {
            AppError::StorageMissing("No compressed folder: nothing has been uploaded".to_string())
        })?;
        self.download(batch).await
    }

    /// Purge a batch's storage
    pub async fn release(&self, batch: ScopeId) -> Result<(), AppError> {
        self.storage.release(batch).await?;
        self.pending.forget(batch).await;
        Ok(())
    }
}

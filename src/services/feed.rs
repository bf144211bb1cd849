//! Feed transformation service
//!
//! Ties the source acquirer, the feed pipeline and working storage together.
//! Handlers call into this layer; it holds no per-request state.

use super::source::{accept_upload, SourceAcquirer, UploadedFile};
use super::storage::{RetainedScopes, ScopeId, WorkingStorage};
use crate::config::{FeedConfig, DEFAULT_RETENTION};
use crate::error::AppError;
use crate::feed::{build_feed, serializer, RawDocument, SkippedRecord};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Prefix of every generated feed artifact
pub const ARTIFACT_PREFIX: &str = "converted";

/// Outcome of one transformation
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    /// Artifact name, downloadable via `/download/{filename}`
    pub filename: String,
    /// Number of items written to the feed
    pub items: usize,
    /// Records left out of the feed
    pub skipped: Vec<SkippedRecord>,
}

/// Catalog-to-feed service
///
/// Keeps the artifacts of the most recent transformations; older ones are
/// removed as new ones are written.
#[derive(Debug)]
pub struct FeedService {
    config: FeedConfig,
    storage: WorkingStorage,
    acquirer: SourceAcquirer,
    retained: RetainedScopes,
}

impl FeedService {
    /// Create a service
    pub fn new(config: FeedConfig, storage: WorkingStorage, acquirer: SourceAcquirer) -> Self {
        Self {
            config,
            storage,
            acquirer,
            retained: RetainedScopes::new(DEFAULT_RETENTION),
        }
    }

    /// Keep at most `limit` feed artifacts
    pub fn with_retention(mut self, limit: usize) -> Self {
        self.retained = RetainedScopes::new(limit);
        self
    }

    /// Working storage used by this service
    pub fn storage(&self) -> &WorkingStorage {
        &self.storage
    }

    /// Artifact name for a scope
    pub fn artifact_name(scope: ScopeId) -> String {
        format!("{}-{}.xml", ARTIFACT_PREFIX, scope)
    }

    /// Transform an uploaded catalog file
    ///
    /// The upload is kept in inbound storage only for the duration of the
    /// transformation.
    pub async fn transform_upload(
        &self,
        upload: Option<UploadedFile>,
    ) -> Result<TransformOutcome, AppError> {
        let upload = accept_upload(upload)?;
        let scope = self.storage.open_scope();

        info!(
            scope = %scope,
            filename = %upload.filename,
            bytes = upload.bytes.len(),
            "Transforming uploaded catalog"
        );

        self.storage
            .save_inbound(scope, &upload.filename, &upload.bytes)
            .await?;
        let result = self.transform(scope, &upload.bytes).await;

        if let Err(e) = self.storage.release_inbound(scope).await {
            warn!(scope = %scope, error = %e, "Failed to clean up inbound upload");
        }

        if let Err(e) = &result {
            error!(filename = %upload.filename, error = %e, "Upload transformation failed");
        }
        result
    }

    /// Fetch a catalog from `url` and transform it
    pub async fn transform_url(&self, url: Option<&str>) -> Result<TransformOutcome, AppError> {
        let url = url.ok_or(AppError::NoUrlProvided)?;
        let bytes = self.acquirer.fetch(url).await?;
        let scope = self.storage.open_scope();

        info!(scope = %scope, url = %url.trim(), bytes = bytes.len(), "Transforming fetched catalog");

        let result = self.transform(scope, &bytes).await;
        if let Err(e) = &result {
            error!(url = %url.trim(), error = %e, "Fetched catalog could not be transformed");
        }
        result
    }

    /// Resolve a previously generated artifact
    pub async fn artifact(&self, filename: &str) -> Result<PathBuf, AppError> {
        self.storage.resolve_artifact(filename).await
    }

    async fn transform(&self, scope: ScopeId, bytes: &[u8]) -> Result<TransformOutcome, AppError> {
        let raw = RawDocument::parse(bytes)?;
        let build = build_feed(&raw, &self.config);

        let filename = Self::artifact_name(scope);
        serializer::persist(&build.document, &self.storage, &filename).await?;
        self.sweep(scope).await;

        info!(
            artifact = %filename,
            items = build.document.items().len(),
            skipped = build.skipped.len(),
            "Feed transformed"
        );

        Ok(TransformOutcome {
            filename,
            items: build.document.items().len(),
            skipped: build.skipped,
        })
    }

    /// Remove the artifacts that fell out of retention once `scope` is kept
    async fn sweep(&self, scope: ScopeId) {
        for evicted in self.retained.admit(scope).await {
            let name = Self::artifact_name(evicted);
            match self.storage.remove_artifact(&name).await {
                Ok(()) => debug!(artifact = %name, "Expired feed artifact"),
                Err(e) => warn!(artifact = %name, error = %e, "Failed to expire feed artifact"),
            }
        }
    }
}

//! Source acquirer
//!
//! Obtains raw catalog bytes either from an uploaded file or by fetching a
//! remote URL, and classifies the ways that can fail.

use crate::config::FetchConfig;
use crate::error::AppError;
use anyhow::anyhow;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A file received in a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-supplied filename (may be blank)
    pub filename: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Create an uploaded file
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Validate an upload
///
/// # Returns
/// * `Ok(UploadedFile)` - The upload, with a non-blank filename
/// * `Err(AppError::NoFileProvided)` - If the request carried no file field
/// * `Err(AppError::EmptyFilename)` - If the filename is blank
pub fn accept_upload(upload: Option<UploadedFile>) -> Result<UploadedFile, AppError> {
    let upload = upload.ok_or(AppError::NoFileProvided)?;
    if upload.filename.trim().is_empty() {
        return Err(AppError::EmptyFilename);
    }
    Ok(upload)
}

/// Fetches catalog documents over HTTP
#[derive(Debug, Clone)]
pub struct SourceAcquirer {
    client: reqwest::Client,
    timeout: Duration,
    retries: u32,
}

impl SourceAcquirer {
    /// Create an acquirer with the configured timeout and retry count
    ///
    /// # Errors
    /// Returns `AppError::Internal` if the HTTP client cannot be created
    pub fn new(config: &FetchConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("catalog-services/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(anyhow!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.timeout,
            retries: config.retries,
        })
    }

    /// Fetch the document at `url`
    ///
    /// Makes one attempt plus the configured number of retries.
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - Response body of a 2xx response
    /// * `Err(AppError::NoUrlProvided)` - If `url` is blank
    /// * `Err(AppError::FetchFailed)` - On transport error, timeout, or non-2xx status
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::NoUrlProvided);
        }

        let attempts = self.retries + 1;
        let mut attempt = 1;
        loop {
            match self.fetch_once(url).await {
                Ok(bytes) => {
                    info!(url = %url, bytes = bytes.len(), attempt, "Fetched catalog");
                    return Ok(bytes);
                }
                Err(e) if attempt < attempts => {
                    warn!(url = %url, attempt, error = %e, "Fetch attempt failed, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    error!(url = %url, attempts, error = %e, "Fetch failed");
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, AppError> {
        debug!(url = %url, "Fetching catalog");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::FetchFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(url, e))?;
        Ok(body.to_vec())
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> AppError {
        let reason = if e.is_timeout() {
            format!("timed out after {}s", self.timeout.as_secs())
        } else {
            e.to_string()
        };
        AppError::FetchFailed {
            url: url.to_string(),
            reason,
        }
    }
}

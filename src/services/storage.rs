//! Working storage
//!
//! Inbound and outbound areas on disk. Every request works inside its own scope
//! (a generated token), so concurrent requests never share artifacts and cleanup
//! only ever touches the scope it was asked to release.

use crate::error::AppError;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier of one request's working-storage scope
pub type ScopeId = Uuid;

/// Inbound/outbound working storage for one service
#[derive(Debug, Clone)]
pub struct WorkingStorage {
    inbound: PathBuf,
    outbound: PathBuf,
}

impl WorkingStorage {
    /// Create storage rooted at the given inbound and outbound directories
    ///
    /// Nothing is created on disk until [`WorkingStorage::bootstrap`] runs.
    pub fn new(inbound: impl Into<PathBuf>, outbound: impl Into<PathBuf>) -> Self {
        Self {
            inbound: inbound.into(),
            outbound: outbound.into(),
        }
    }

    /// Ensure both roots exist
    pub async fn bootstrap(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.inbound).await?;
        fs::create_dir_all(&self.outbound).await?;
        debug!(
            inbound = %self.inbound.display(),
            outbound = %self.outbound.display(),
            "Working storage ready"
        );
        Ok(())
    }

    /// Inbound root directory
    pub fn inbound_root(&self) -> &Path {
        &self.inbound
    }

    /// Outbound root directory
    pub fn outbound_root(&self) -> &Path {
        &self.outbound
    }

    /// Allocate a fresh scope token
    pub fn open_scope(&self) -> ScopeId {
        Uuid::new_v4()
    }

    /// Create a scope's inbound and outbound directories
    pub async fn prepare_scope(&self, scope: ScopeId) -> Result<(), AppError> {
        fs::create_dir_all(self.inbound_dir(scope)).await?;
        fs::create_dir_all(self.outbound_dir(scope)).await?;
        Ok(())
    }

    /// Inbound directory of a scope
    pub fn inbound_dir(&self, scope: ScopeId) -> PathBuf {
        self.inbound.join(scope.to_string())
    }

    /// Outbound directory of a scope
    pub fn outbound_dir(&self, scope: ScopeId) -> PathBuf {
        self.outbound.join(scope.to_string())
    }

    /// Path of the archive built for a scope
    pub fn archive_path(&self, scope: ScopeId) -> PathBuf {
        self.outbound.join(format!("{}.zip", scope))
    }

    /// Save an uploaded file into the scope's inbound directory
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Where the file was written
    /// * `Err(AppError)` - If the filename is unusable or the write failed
    pub async fn save_inbound(
        &self,
        scope: ScopeId,
        filename: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, AppError> {
        let dir = self.inbound_dir(scope);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(sanitize_filename(filename)?);
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Write a file into the scope's outbound directory, replacing a same-named file
    pub async fn write_outbound(
        &self,
        scope: ScopeId,
        filename: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, AppError> {
        let dir = self.outbound_dir(scope);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(sanitize_filename(filename)?);
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Write a named artifact at the outbound root, replacing any previous one
    ///
    /// The bytes go to a temporary sibling first and are renamed into place, so a
    /// reader sees either the old or the new artifact, never a partial one.
    pub async fn write_artifact(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
        let name = validate_artifact_name(name)?;
        let path = self.outbound.join(name);
        let staging = self.outbound.join(format!(".{}.{}.tmp", name, Uuid::new_v4()));

        fs::write(&staging, bytes).await?;
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(AppError::Storage(e));
        }

        info!(artifact = %path.display(), bytes = bytes.len(), "Stored artifact");
        Ok(path)
    }

    /// Resolve a named artifact at the outbound root
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Path of an existing artifact
    /// * `Err(AppError::InvalidPath)` - If the name could escape the outbound root
    /// * `Err(AppError::FileNotFound)` - If no such artifact exists
    pub async fn resolve_artifact(&self, name: &str) -> Result<PathBuf, AppError> {
        let path = self.outbound.join(validate_artifact_name(name)?);
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(path),
            _ => Err(AppError::FileNotFound(name.to_string())),
        }
    }

    /// Remove a named artifact at the outbound root, if it exists
    pub async fn remove_artifact(&self, name: &str) -> Result<(), AppError> {
        let path = self.outbound.join(validate_artifact_name(name)?);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(artifact = %path.display(), "Removed artifact");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(e)),
        }
    }

    /// Remove a scope's inbound directory only
    pub async fn release_inbound(&self, scope: ScopeId) -> Result<(), AppError> {
        remove_dir_if_present(&self.inbound_dir(scope)).await?;
        fs::create_dir_all(&self.inbound).await?;
        Ok(())
    }

    /// Remove everything a scope owns, then make sure both roots exist again
    ///
    /// Other scopes are left untouched.
    pub async fn release(&self, scope: ScopeId) -> Result<(), AppError> {
        remove_dir_if_present(&self.inbound_dir(scope)).await?;
        remove_dir_if_present(&self.outbound_dir(scope)).await?;

        match fs::remove_file(self.archive_path(scope)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(AppError::Storage(e)),
        }

        self.bootstrap().await?;
        info!(scope = %scope, "Released working storage");
        Ok(())
    }
}

/// Live scopes of one service, oldest first, bounded by a limit
///
/// Admitting a scope beyond the limit evicts the oldest ones; the caller owns
/// removing their storage.
#[derive(Debug)]
pub struct RetainedScopes {
    limit: usize,
    scopes: Mutex<VecDeque<ScopeId>>,
}

impl RetainedScopes {
    /// Keep at most `limit` scopes (at least one)
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            scopes: Mutex::new(VecDeque::new()),
        }
    }

    /// Record `scope` as the newest; returns the scopes that no longer fit
    pub async fn admit(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut scopes = self.scopes.lock().await;
        scopes.retain(|s| *s != scope);
        scopes.push_back(scope);

        let overflow = scopes.len().saturating_sub(self.limit);
        let evicted: Vec<ScopeId> = scopes.drain(..overflow).collect();
        evicted
    }

    /// Stop tracking `scope`
    pub async fn forget(&self, scope: ScopeId) {
        self.scopes.lock().await.retain(|s| *s != scope);
    }

    /// The most recently admitted scope still tracked
    pub async fn newest(&self) -> Option<ScopeId> {
        self.scopes.lock().await.back().copied()
    }
}

async fn remove_dir_if_present(dir: &Path) -> Result<(), AppError> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to remove directory");
            Err(AppError::Storage(e))
        }
    }
}

/// Reduce a client-supplied filename to a bare, safe file name
///
/// Directory components are dropped (`a/b/c.png` → `c.png`).
pub fn sanitize_filename(filename: &str) -> Result<&str, AppError> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        return Err(AppError::InvalidPath(format!(
            "Unusable filename: {:?}",
            filename
        )));
    }
    Ok(base)
}

/// Accept only names that stay directly inside the outbound root
pub fn validate_artifact_name(name: &str) -> Result<&str, AppError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0')
    {
        return Err(AppError::InvalidPath(format!(
            "Invalid artifact name: {:?}",
            name
        )));
    }
    Ok(name)
}

//! Batch archiver
//!
//! Collects the compressed files of a batch and packages them into one zip.

use super::compressor::CompressedImage;
use crate::error::AppError;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Read every regular file in a batch's outbound directory
///
/// # Returns
/// * `Ok(Vec<CompressedImage>)` - Entries sorted by filename
/// * `Err(AppError::StorageMissing)` - If the directory does not exist
pub fn collect_entries(dir: &Path) -> Result<Vec<CompressedImage>, AppError> {
    if !dir.is_dir() {
        return Err(AppError::StorageMissing(format!(
            "No compressed folder at {}",
            dir.display()
        )));
    }

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let bytes = std::fs::read(&path)?;
        entries.push(CompressedImage { filename, bytes });
    }

    entries.sort_by(|a, b| a.filename.cmp(&b.filename));
    debug!(dir = %dir.display(), count = entries.len(), "Collected batch entries");
    Ok(entries)
}

/// Write entries into a zip archive at `dest`
///
/// Entries sharing a filename collapse to one: the last one wins and keeps the
/// position of the first.
///
/// # Returns
/// * `Ok(usize)` - Number of entries in the archive
/// * `Err(AppError::EmptyBatch)` - If there is nothing to archive
/// * `Err(AppError::ArchiveWriteFailed)` - If the archive could not be written
pub fn write_archive(entries: &[CompressedImage], dest: &Path) -> Result<usize, AppError> {
    if entries.is_empty() {
        return Err(AppError::EmptyBatch);
    }

    let mut unique: Vec<&CompressedImage> = Vec::with_capacity(entries.len());
    for entry in entries {
        match unique.iter_mut().find(|e| e.filename == entry.filename) {
            Some(slot) => *slot = entry,
            None => unique.push(entry),
        }
    }

    let write_failed = |e: &dyn std::fmt::Display| {
        AppError::ArchiveWriteFailed(format!("{}: {}", dest.display(), e))
    };

    let file = File::create(dest).map_err(|e| write_failed(&e))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    for entry in &unique {
        writer
            .start_file(entry.filename.as_str(), options)
            .map_err(|e| write_failed(&e))?;
        writer.write_all(&entry.bytes).map_err(|e| write_failed(&e))?;
    }
    writer.finish().map_err(|e| write_failed(&e))?;

    info!(archive = %dest.display(), entries = unique.len(), "Wrote archive");
    Ok(unique.len())
}

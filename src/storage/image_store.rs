// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload and result image storage
//!
//! Uploads live only for the duration of a request; annotated results are
//! kept in the output directory and served by name.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

/// Reduce a client-supplied filename to a safe local name
///
/// Directory components are dropped, whitespace runs become `_`, only ASCII
/// alphanumerics and `.`, `-`, `_` survive, and leading or trailing dots and
/// underscores are stripped. An empty result falls back to a random name.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();

    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    let cleaned = filtered.trim_matches(|c: char| c == '.' || c == '_');
    if cleaned.is_empty() {
        format!("upload_{}", uuid::Uuid::new_v4().simple())
    } else {
        cleaned.to_string()
    }
}

/// Name of the annotated result for an upload, always a `.jpg`
///
/// A short random suffix keeps results of same-named uploads apart.
pub fn result_filename(upload_name: &str) -> String {
    let stem = match upload_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => upload_name,
    };
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("result_{}_{}.jpg", stem, &id[..8])
}

/// Deletes the upload when dropped
#[derive(Debug)]
pub struct UploadGuard {
    path: PathBuf,
    filename: String,
}

impl UploadGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Read the stored upload back from disk
    pub async fn read(&self) -> Result<Vec<u8>, StoreError> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove upload {}: {}", self.path.display(), e),
        }
    }
}

/// Upload and output folders
#[derive(Debug, Clone)]
pub struct ImageStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl ImageStore {
    /// Create the store, creating both directories if needed
    pub async fn new(
        upload_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, StoreError> {
        let upload_dir = upload_dir.into();
        let output_dir = output_dir.into();

        tokio::fs::create_dir_all(&upload_dir).await?;
        tokio::fs::create_dir_all(&output_dir).await?;

        info!(
            "Image store ready (uploads: {}, results: {})",
            upload_dir.display(),
            output_dir.display()
        );

        Ok(Self {
            upload_dir,
            output_dir,
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write an upload to disk; the file is removed when the guard drops
    pub async fn save_upload(&self, filename: &str, bytes: &[u8]) -> Result<UploadGuard, StoreError> {
        let filename = secure_filename(filename);
        let path = self.upload_dir.join(&filename);

        tokio::fs::write(&path, bytes).await?;
        debug!("Saved upload {} ({} bytes)", path.display(), bytes.len());

        Ok(UploadGuard { path, filename })
    }

    /// Store an annotated JPEG and return its filename
    pub async fn save_result(&self, upload_name: &str, jpeg: &[u8]) -> Result<String, StoreError> {
        let filename = result_filename(&secure_filename(upload_name));
        let path = self.output_dir.join(&filename);

        tokio::fs::write(&path, jpeg).await?;
        info!("Saved result image {}", path.display());

        Ok(filename)
    }

    /// Read a previously stored result image
    pub async fn load_result(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        if secure_filename(filename) != filename {
            return Err(StoreError::InvalidFilename(filename.to_string()));
        }

        let path = self.output_dir.join(filename);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(filename.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

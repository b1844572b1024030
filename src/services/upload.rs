// src/services/upload.rs

//! Upload proxy.
//!
//! Validates a single binary against coarse intake rules and forwards it
//! to the bucket for its media kind:
//!
//! | kind    | rule                              | key                    |
//! |---------|-----------------------------------|------------------------|
//! | `image` | `image/*`, at most 5 MiB          | `images/{id}.{ext}`    |
//! | `video` | `video/*`, at most 30 MiB         | `{id}.{ext}`           |
//! | `eeg`   | filename ends with `.csv`         | `{id}.csv`             |

use std::sync::Arc;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, Result, UploadErrorKind};
use crate::models::{KeyStrategy, MediaFile, MediaKind, UploadConfig};
use crate::storage::ObjectStorage;

/// Check a file against the rules for its media kind.
///
/// Runs before any storage call; also used client-side when a file is
/// attached to a submission.
pub fn validate_upload(kind: MediaKind, file: &MediaFile, config: &UploadConfig) -> Result<()> {
    if file.is_empty() {
        return Err(AppError::upload(
            UploadErrorKind::InvalidType,
            format!("{} file '{}' is empty", kind, file.filename),
        ));
    }

    match kind {
        MediaKind::Eeg => {
            if !file.filename.to_ascii_lowercase().ends_with(".csv") {
                return Err(AppError::upload(
                    UploadErrorKind::InvalidType,
                    format!("Only CSV files are allowed, got '{}'", file.filename),
                ));
            }
        }
        MediaKind::Image | MediaKind::Video => {
            let prefix = format!("{}/", kind.as_str());
            if !file.content_type.to_ascii_lowercase().starts_with(&prefix) {
                return Err(AppError::upload(
                    UploadErrorKind::InvalidType,
                    format!(
                        "Expected a {}* file, got '{}'",
                        prefix, file.content_type
                    ),
                ));
            }
        }
    }

    if let Some(max) = config.max_bytes(kind) {
        if file.len() > max {
            return Err(AppError::upload(
                UploadErrorKind::TooLarge,
                format!(
                    "{} too large ({} bytes). Max size is {}MB",
                    kind,
                    file.len(),
                    max / (1024 * 1024)
                ),
            ));
        }
    }

    Ok(())
}

/// Extension for the stored object: the filename's own when it looks sane.
fn key_extension(kind: MediaKind, file: &MediaFile) -> String {
    if kind == MediaKind::Eeg {
        return "csv".to_string();
    }
    file.extension()
        .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| kind.default_extension().to_string())
}

/// Derive the storage key for an upload.
pub fn storage_key(kind: MediaKind, file: &MediaFile, strategy: KeyStrategy) -> String {
    let id = match strategy {
        KeyStrategy::Uuid => Uuid::new_v4().to_string(),
        KeyStrategy::ContentHash => hex::encode(Sha256::digest(&file.bytes)),
    };
    let ext = key_extension(kind, file);

    match kind {
        MediaKind::Image => format!("images/{id}.{ext}"),
        MediaKind::Video | MediaKind::Eeg => format!("{id}.{ext}"),
    }
}

/// Content type recorded on the stored object.
pub fn stored_content_type(kind: MediaKind, file: &MediaFile) -> &str {
    match kind {
        MediaKind::Eeg => "text/csv",
        MediaKind::Image | MediaKind::Video => &file.content_type,
    }
}

/// Service that validates uploads and forwards them to object storage.
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn ObjectStorage>,
    config: UploadConfig,
}

impl UploadService {
    pub fn new(storage: Arc<dyn ObjectStorage>, config: UploadConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Validate and store a binary, returning its key.
    pub async fn upload(&self, kind: MediaKind, file: &MediaFile) -> Result<String> {
        validate_upload(kind, file, &self.config)?;

        let bucket = self.config.buckets.name(kind);
        let key = storage_key(kind, file, self.config.key_strategy);
        let content_type = stored_content_type(kind, file);

        let stored = self
            .storage
            .put_object(bucket, &key, &file.bytes, content_type)
            .await
            .map_err(|e| {
                log::error!("{} upload to bucket '{}' failed: {}", kind, bucket, e);
                AppError::upload(UploadErrorKind::StorageFailure, e.to_string())
            })?;

        log::info!(
            "Uploaded {} '{}' ({} bytes) as {}/{}",
            kind,
            file.filename,
            file.len(),
            bucket,
            stored
        );
        Ok(stored)
    }
}

// src/error.rs

//! Unified error handling for the screening backend and client.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{MediaKind, Stage};

/// Result type alias for screening operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Reason an upload was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadErrorKind {
    /// Wrong MIME type or file extension
    InvalidType,
    /// Payload exceeds the configured limit
    TooLarge,
    /// The storage backend rejected the write
    StorageFailure,
}

impl UploadErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadErrorKind::InvalidType => "invalid-type",
            UploadErrorKind::TooLarge => "too-large",
            UploadErrorKind::StorageFailure => "storage-failure",
        }
    }
}

impl fmt::Display for UploadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Object or record storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request or input validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Upload refused or failed
    #[error("Upload error ({kind}): {message}")]
    Upload {
        kind: UploadErrorKind,
        message: String,
    },

    /// One or more intake inputs were never provided
    #[error("Missing input: {}", format_kinds(.0))]
    MissingInput(Vec<MediaKind>),

    /// The remote API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A sequencer stage failed
    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: Stage, message: String },
}

fn format_kinds(kinds: &[MediaKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl AppError {
    /// Create a storage error.
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an upload error of the given kind.
    pub fn upload(kind: UploadErrorKind, message: impl Into<String>) -> Self {
        Self::Upload {
            kind,
            message: message.into(),
        }
    }

    /// Create an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a stage failure.
    pub fn stage(stage: Stage, message: impl fmt::Display) -> Self {
        Self::Stage {
            stage,
            message: message.to_string(),
        }
    }

    /// Upload error kind, when this error maps onto the upload contract.
    pub fn upload_kind(&self) -> Option<UploadErrorKind> {
        match self {
            AppError::Upload { kind, .. } => Some(*kind),
            AppError::Storage(_) | AppError::Io(_) => Some(UploadErrorKind::StorageFailure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&UploadErrorKind::StorageFailure).unwrap();
        assert_eq!(json, "\"storage-failure\"");
        assert_eq!(UploadErrorKind::TooLarge.to_string(), "too-large");
    }

    #[test]
    fn test_missing_input_lists_kinds() {
        let err = AppError::MissingInput(vec![MediaKind::Image, MediaKind::Eeg]);
        assert_eq!(err.to_string(), "Missing input: image, eeg");
    }

    #[test]
    fn test_storage_error_maps_to_storage_failure() {
        let err = AppError::storage("bucket offline");
        assert_eq!(err.upload_kind(), Some(UploadErrorKind::StorageFailure));
        assert_eq!(AppError::validation("x").upload_kind(), None);
    }
}

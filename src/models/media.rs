// src/models/media.rs

//! Intake media: the three binaries a screening is built from.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Kind of binary collected during intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Selfie snapshot
    Image,
    /// Short facial motion recording
    Video,
    /// EEG export from clinical equipment (CSV)
    Eeg,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Image, MediaKind::Video, MediaKind::Eeg];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Eeg => "eeg",
        }
    }

    /// Extension used for storage keys when the filename has none.
    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
            MediaKind::Eeg => "csv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "image" | "photo" | "selfie" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "eeg" => Ok(MediaKind::Eeg),
            other => Err(AppError::validation(format!("Unknown media kind: {other}"))),
        }
    }
}

/// A binary payload with the metadata the upload proxy validates.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, inferring the content type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::validation(format!("Not a file path: {}", path.display())))?;
        let content_type = guess_content_type(&filename).to_string();

        Ok(Self {
            filename,
            content_type,
            bytes,
        })
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercased extension of the filename, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

// Binaries can be tens of megabytes; keep them out of debug output.
impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Map a filename extension onto a MIME type.
pub fn guess_content_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "webm" => "video/webm",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "csv" => "text/csv",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_str() {
        assert_eq!("image".parse::<MediaKind>().unwrap(), MediaKind::Image);
        assert_eq!("EEG".parse::<MediaKind>().unwrap(), MediaKind::Eeg);
        assert!("audio".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_extension() {
        let file = MediaFile::new("Recording.WEBM", "video/webm", vec![1]);
        assert_eq!(file.extension(), Some("webm".to_string()));
        assert_eq!(MediaFile::new("noext", "", vec![]).extension(), None);
        assert_eq!(MediaFile::new(".hidden", "", vec![]).extension(), None);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("selfie.JPG"), "image/jpeg");
        assert_eq!(guess_content_type("clip.webm"), "video/webm");
        assert_eq!(guess_content_type("data.csv"), "text/csv");
        assert_eq!(guess_content_type("blob"), "application/octet-stream");
    }

    #[test]
    fn test_debug_omits_bytes() {
        let file = MediaFile::new("a.csv", "text/csv", vec![0u8; 4]);
        let debug = format!("{file:?}");
        assert!(debug.contains("len: 4"));
        assert!(!debug.contains("bytes"));
    }

    #[tokio::test]
    async fn test_from_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data.csv");
        tokio::fs::write(&path, b"t,ch1\n0,1\n").await.unwrap();

        let file = MediaFile::from_path(&path).await.unwrap();
        assert_eq!(file.filename, "data.csv");
        assert_eq!(file.content_type, "text/csv");
        assert_eq!(file.len(), 10);
    }
}

//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::MediaKind;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upload limits, buckets and key naming
    #[serde(default)]
    pub uploads: UploadConfig,

    /// Object and record storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// API client behavior for the submission sequencer
    #[serde(default)]
    pub client: ClientConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.uploads.image_max_bytes == 0 {
            return Err(AppError::validation("uploads.image_max_bytes must be > 0"));
        }
        if self.uploads.video_max_bytes == 0 {
            return Err(AppError::validation("uploads.video_max_bytes must be > 0"));
        }
        for kind in MediaKind::ALL {
            if self.uploads.buckets.name(kind).trim().is_empty() {
                return Err(AppError::validation(format!(
                    "uploads.buckets.{} is empty",
                    kind
                )));
            }
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.trim().is_empty() {
            return Err(AppError::validation(
                "storage.bucket is required for the s3 backend",
            ));
        }
        if self.client.user_agent.trim().is_empty() {
            return Err(AppError::validation("client.user_agent is empty"));
        }
        if self.client.timeout_secs == 0 {
            return Err(AppError::validation("client.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.client.base_url).map_err(|e| {
            AppError::validation(format!(
                "client.base_url '{}' is not a valid URL: {}",
                self.client.base_url, e
            ))
        })?;
        Ok(())
    }
}

/// How storage keys are derived for uploaded objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategy {
    /// Random UUID v4 per upload
    #[default]
    Uuid,
    /// SHA-256 digest of the payload
    ContentHash,
}

impl FromStr for KeyStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "uuid" => Ok(KeyStrategy::Uuid),
            "content-hash" | "content_hash" | "sha256" => Ok(KeyStrategy::ContentHash),
            other => Err(AppError::config(format!("Unknown key strategy: {other}"))),
        }
    }
}

/// Upload proxy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum selfie size in bytes
    #[serde(default = "defaults::image_max_bytes")]
    pub image_max_bytes: u64,

    /// Maximum video size in bytes
    #[serde(default = "defaults::video_max_bytes")]
    pub video_max_bytes: u64,

    /// Key naming for stored objects
    #[serde(default)]
    pub key_strategy: KeyStrategy,

    /// Bucket names per media kind
    #[serde(default)]
    pub buckets: BucketConfig,
}

impl UploadConfig {
    /// Size limit for a media kind. EEG files are only checked by extension.
    pub fn max_bytes(&self, kind: MediaKind) -> Option<u64> {
        match kind {
            MediaKind::Image => Some(self.image_max_bytes),
            MediaKind::Video => Some(self.video_max_bytes),
            MediaKind::Eeg => None,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            image_max_bytes: defaults::image_max_bytes(),
            video_max_bytes: defaults::video_max_bytes(),
            key_strategy: KeyStrategy::default(),
            buckets: BucketConfig::default(),
        }
    }
}

/// Bucket name for each media kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    #[serde(default = "defaults::images_bucket")]
    pub images: String,
    #[serde(default = "defaults::videos_bucket")]
    pub videos: String,
    #[serde(default = "defaults::eeg_bucket")]
    pub eeg: String,
}

impl BucketConfig {
    pub fn name(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.images,
            MediaKind::Video => &self.videos,
            MediaKind::Eeg => &self.eeg,
        }
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            images: defaults::images_bucket(),
            videos: defaults::videos_bucket(),
            eeg: defaults::eeg_bucket(),
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

/// Storage backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the local backend
    #[serde(default = "defaults::storage_root")]
    pub root: String,

    /// S3 bucket holding every logical bucket as a prefix
    #[serde(default = "defaults::s3_bucket")]
    pub bucket: String,

    /// Key prefix inside the S3 bucket
    #[serde(default = "defaults::s3_prefix")]
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: defaults::storage_root(),
            bucket: defaults::s3_bucket(),
            prefix: defaults::s3_prefix(),
        }
    }
}

/// HTTP client settings used by the sequencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL the endpoint paths are joined onto
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Automatic retries from the failed stage
    #[serde(default)]
    pub max_retries: u32,

    /// Delay before each automatic retry in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: 0,
            retry_delay_ms: defaults::retry_delay(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    const MIB: u64 = 1024 * 1024;

    // Upload defaults
    pub fn image_max_bytes() -> u64 {
        5 * MIB
    }
    pub fn video_max_bytes() -> u64 {
        30 * MIB
    }
    pub fn images_bucket() -> String {
        "images".into()
    }
    pub fn videos_bucket() -> String {
        "videos".into()
    }
    pub fn eeg_bucket() -> String {
        "eeg".into()
    }

    // Storage defaults
    pub fn storage_root() -> String {
        "storage".into()
    }
    pub fn s3_bucket() -> String {
        "screening-intake".into()
    }
    pub fn s3_prefix() -> String {
        "screening".into()
    }

    // Client defaults
    pub fn base_url() -> String {
        "http://localhost:3000/api/".into()
    }
    pub fn user_agent() -> String {
        concat!("screening/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        120
    }
    pub fn retry_delay() -> u64 {
        1000
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn default_limits_match_intake_rules() {
        let uploads = UploadConfig::default();
        assert_eq!(uploads.max_bytes(MediaKind::Image), Some(5 * 1024 * 1024));
        assert_eq!(uploads.max_bytes(MediaKind::Video), Some(30 * 1024 * 1024));
        assert_eq!(uploads.max_bytes(MediaKind::Eeg), None);
    }

    #[test]
    fn validate_rejects_zero_video_limit() {
        let mut config = Config::default();
        config.uploads.video_max_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.client.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [uploads]
            video_max_bytes = 52428800
            key_strategy = "content-hash"

            [storage]
            backend = "s3"
            bucket = "intake-prod"
            "#,
        )
        .unwrap();

        assert_eq!(config.uploads.video_max_bytes, 50 * 1024 * 1024);
        assert_eq!(config.uploads.image_max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.uploads.key_strategy, KeyStrategy::ContentHash);
        assert_eq!(config.uploads.buckets.name(MediaKind::Eeg), "eeg");
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.prefix, "screening");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_or_default_falls_back() {
        let config = Config::load_or_default("/nonexistent/config.toml");
        assert_eq!(config.logging.level, "info");
    }
}

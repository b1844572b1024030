// src/config.rs

//! Configuration loading utilities.
//!
//! This module provides convenience functions for loading configuration
//! from files and, for Lambda deployments, from environment variables.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Config, StorageBackend};

/// Load configuration from a TOML file and validate it.
///
/// Falls back to defaults if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path);
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid config {path:?}: {e}")))?;
    Ok(config)
}

/// Build the configuration for the Lambda environment.
///
/// Starts from `CONFIG_PATH` (or defaults with the S3 backend) and applies
/// environment overrides.
pub fn load_lambda_config() -> Result<Config> {
    let mut config = match std::env::var("CONFIG_PATH") {
        Ok(path) => Config::load(&path)?,
        Err(_) => {
            let mut config = Config::default();
            config.storage.backend = StorageBackend::S3;
            config
        }
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Apply overrides looked up by variable name.
pub fn apply_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(bucket) = lookup("S3_BUCKET") {
        config.storage.bucket = bucket;
    }
    if let Some(prefix) = lookup("S3_PREFIX") {
        config.storage.prefix = prefix;
    }
    if let Some(root) = lookup("STORAGE_ROOT") {
        config.storage.backend = StorageBackend::Local;
        config.storage.root = root;
    }
    if let Some(bytes) = lookup("IMAGE_MAX_BYTES") {
        config.uploads.image_max_bytes = parse_number("IMAGE_MAX_BYTES", &bytes)?;
    }
    if let Some(bytes) = lookup("VIDEO_MAX_BYTES") {
        config.uploads.video_max_bytes = parse_number("VIDEO_MAX_BYTES", &bytes)?;
    }
    if let Some(strategy) = lookup("KEY_STRATEGY") {
        config.uploads.key_strategy = strategy.parse()?;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.logging.level = level;
    }
    Ok(())
}

fn parse_number(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| AppError::config(format!("{name}='{value}' is not a number: {e}")))
}

// src/models/mod.rs

//! Domain models for the screening intake.
//!
//! This module contains all data structures shared by the upload proxy,
//! the record store and the submission sequencer.

mod config;
mod media;
mod record;
mod stage;

// Re-export all public types
pub use config::{
    BucketConfig, ClientConfig, Config, KeyStrategy, LoggingConfig, StorageBackend,
    StorageConfig, UploadConfig,
};
pub use media::{MediaFile, MediaKind, guess_content_type};
pub use record::{ScreeningOutput, ScreeningRecord, StorageKeys};
pub use stage::{Progress, Stage, StageStatus};

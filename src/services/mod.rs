//! Service layer for the screening backend.
//!
//! This module contains the business logic for:
//! - Upload validation and storage (`UploadService`)
//! - Record counting and result creation (`ScreeningService`)

mod screening;
mod upload;

use std::sync::Arc;

pub use screening::{Analyzer, PlaceholderAnalyzer, ResultKeys, ScreeningService};
pub use upload::{UploadService, storage_key, stored_content_type, validate_upload};

use crate::error::Result;
use crate::models::{Config, StorageBackend};
use crate::storage::{LocalStorage, ObjectStorage, RecordStore};

/// Shared backend state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub uploads: UploadService,
    pub screening: ScreeningService,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        objects: Arc<dyn ObjectStorage>,
        records: Arc<dyn RecordStore>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        Self {
            uploads: UploadService::new(objects, config.uploads.clone()),
            screening: ScreeningService::new(records, analyzer),
            config,
        }
    }

    /// State backed by one local storage root for objects and records.
    pub fn local(config: Arc<Config>, storage: LocalStorage) -> Self {
        let storage = Arc::new(storage);
        Self::new(
            config,
            storage.clone(),
            storage,
            Arc::new(PlaceholderAnalyzer),
        )
    }

    /// State for the backend selected in `config.storage`.
    pub async fn from_config(config: Arc<Config>) -> Result<Self> {
        match config.storage.backend {
            StorageBackend::Local => {
                let storage = LocalStorage::new(&config.storage.root);
                Ok(Self::local(config, storage))
            }
            #[cfg(feature = "s3")]
            StorageBackend::S3 => {
                let storage = Arc::new(crate::storage::s3::S3Storage::from_config(&config.storage).await?);
                Ok(Self::new(
                    config,
                    storage.clone(),
                    storage,
                    Arc::new(PlaceholderAnalyzer),
                ))
            }
            #[cfg(not(feature = "s3"))]
            StorageBackend::S3 => Err(crate::error::AppError::config(
                "storage.backend = \"s3\" requires the `s3` feature",
            )),
        }
    }
}

// src/services/screening.rs

//! Record count lookup and the analysis step.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ScreeningOutput, ScreeningRecord};
use crate::storage::RecordStore;

/// Keys of the three uploaded binaries a result is computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultKeys {
    pub image_key: String,
    pub video_key: String,
    pub eeg_key: String,
}

/// Scoring backend for a completed intake.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, keys: &ResultKeys) -> Result<ScreeningOutput>;
}

/// Fixed output used until a real scoring model is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderAnalyzer;

impl PlaceholderAnalyzer {
    pub const SCORE: f64 = 0.87;
    pub const RISK: &'static str = "medium";
}

#[async_trait]
impl Analyzer for PlaceholderAnalyzer {
    async fn analyze(&self, _keys: &ResultKeys) -> Result<ScreeningOutput> {
        Ok(ScreeningOutput::new(Self::SCORE, Self::RISK))
    }
}

/// Count lookup and result creation over a record store.
#[derive(Clone)]
pub struct ScreeningService {
    records: Arc<dyn RecordStore>,
    analyzer: Arc<dyn Analyzer>,
}

impl ScreeningService {
    pub fn new(records: Arc<dyn RecordStore>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self { records, analyzer }
    }

    /// Number of prior screenings for a user.
    pub async fn count(&self, user_id: &str) -> Result<u64> {
        let user_id = require_user(user_id)?;
        self.records.count_for_user(user_id).await
    }

    /// Analyze the uploaded binaries and persist a screening record.
    ///
    /// The test number is the user's prior count + 1. Count and insert are
    /// not atomic, so concurrent submissions can share a number.
    pub async fn fetch_result(&self, user_id: &str, keys: &ResultKeys) -> Result<ScreeningRecord> {
        let user_id = require_user(user_id)?;
        for (name, key) in [
            ("imageKey", &keys.image_key),
            ("videoKey", &keys.video_key),
            ("eegKey", &keys.eeg_key),
        ] {
            if key.trim().is_empty() {
                return Err(AppError::validation(format!("{name} is required")));
            }
        }

        let output = self.analyzer.analyze(keys).await?;
        let prior = self.records.count_for_user(user_id).await?;

        let record = ScreeningRecord::new(
            user_id,
            &keys.image_key,
            &keys.video_key,
            &keys.eeg_key,
            output,
            prior + 1,
        );
        self.records.insert_record(&record).await?;

        Ok(record)
    }
}

fn require_user(user_id: &str) -> Result<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("userId is required"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use tempfile::TempDir;

    fn keys() -> ResultKeys {
        ResultKeys {
            image_key: "images/a.jpg".into(),
            video_key: "b.mp4".into(),
            eeg_key: "c.csv".into(),
        }
    }

    fn service(tmp: &TempDir) -> ScreeningService {
        ScreeningService::new(
            Arc::new(LocalStorage::new(tmp.path())),
            Arc::new(PlaceholderAnalyzer),
        )
    }

    #[tokio::test]
    async fn test_fetch_result_returns_placeholder_output() {
        let tmp = TempDir::new().unwrap();
        let svc = service(&tmp);

        let record = svc.fetch_result("user-1", &keys()).await.unwrap();
        assert_eq!(record.screening_output, ScreeningOutput::new(0.87, "medium"));
        assert_eq!(record.eeg_key, "c.csv");
    }

    #[tokio::test]
    async fn test_test_number_increments_per_user() {
        let tmp = TempDir::new().unwrap();
        let svc = service(&tmp);

        assert_eq!(svc.fetch_result("a", &keys()).await.unwrap().test_number, 1);
        assert_eq!(svc.fetch_result("a", &keys()).await.unwrap().test_number, 2);
        assert_eq!(svc.fetch_result("b", &keys()).await.unwrap().test_number, 1);
        assert_eq!(svc.count("a").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_count_requires_user() {
        let tmp = TempDir::new().unwrap();
        let svc = service(&tmp);

        assert!(matches!(svc.count("  ").await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_fetch_result_requires_keys() {
        let tmp = TempDir::new().unwrap();
        let svc = service(&tmp);

        let mut partial = keys();
        partial.video_key = String::new();
        let err = svc.fetch_result("a", &partial).await.unwrap_err();
        assert!(err.to_string().contains("videoKey"));
        assert_eq!(svc.count("a").await.unwrap(), 0);
    }
}

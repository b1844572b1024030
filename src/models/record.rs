// src/models/record.rs

//! Screening output and the persisted screening record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of the analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningOutput {
    pub score: f64,
    pub risk: String,
}

impl ScreeningOutput {
    pub fn new(score: f64, risk: impl Into<String>) -> Self {
        Self {
            score,
            risk: risk.into(),
        }
    }
}

/// Storage keys of the three uploaded binaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageKeys {
    pub image_key: Option<String>,
    pub video_key: Option<String>,
    pub eeg_key: Option<String>,
}

impl StorageKeys {
    pub fn is_complete(&self) -> bool {
        self.image_key.is_some() && self.video_key.is_some() && self.eeg_key.is_some()
    }
}

/// One row per completed submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    pub id: Uuid,
    pub user_id: String,
    pub image_key: String,
    pub video_key: String,
    pub eeg_key: String,
    pub screening_output: ScreeningOutput,
    /// Count of the user's prior records + 1
    pub test_number: u64,
    pub created_at: DateTime<Utc>,
}

impl ScreeningRecord {
    pub fn new(
        user_id: impl Into<String>,
        image_key: impl Into<String>,
        video_key: impl Into<String>,
        eeg_key: impl Into<String>,
        screening_output: ScreeningOutput,
        test_number: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            image_key: image_key.into(),
            video_key: video_key.into(),
            eeg_key: eeg_key.into(),
            screening_output,
            test_number,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_camel_case() {
        let keys = StorageKeys {
            image_key: Some("images/a.jpg".into()),
            video_key: None,
            eeg_key: Some("c.csv".into()),
        };
        let json = serde_json::to_value(&keys).unwrap();
        assert_eq!(json["imageKey"], "images/a.jpg");
        assert!(json["videoKey"].is_null());
        assert!(!keys.is_complete());
    }

    #[test]
    fn test_record_roundtrip_keeps_output() {
        let record = ScreeningRecord::new(
            "user-1",
            "images/a.jpg",
            "b.mp4",
            "c.csv",
            ScreeningOutput::new(0.87, "medium"),
            3,
        );
        let json = serde_json::to_string(&record).unwrap();
        let loaded: ScreeningRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.test_number, 3);
    }
}

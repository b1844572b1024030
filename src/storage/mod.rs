//! Storage abstractions for intake binaries and screening records.
//!
//! Objects are grouped into logical buckets (`images`, `videos`, `eeg`);
//! each backend maps a `(bucket, key)` pair onto its own layout.
//!
//! ## Layout
//!
//! ```text
//! storage/
//! ├── images/
//! │   └── images/{uuid}.jpg
//! ├── videos/
//! │   └── {uuid}.mp4
//! ├── eeg/
//! │   └── {uuid}.csv
//! └── records/
//!     └── {user digest}/
//!         └── {record id}.json # one object per screening record
//! ```

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::ScreeningRecord;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for binary object backends.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store an object and return the key it was stored under.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String>;
}

/// Trait for screening record persistence.
///
/// Every record is its own object, so concurrent inserts never lose rows.
/// Counting and inserting are still separate calls; callers that derive a
/// sequence number from the count can hand out the same number twice.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Number of records owned by `user_id`.
    async fn count_for_user(&self, user_id: &str) -> Result<u64>;

    /// All records owned by `user_id`, oldest first.
    async fn records_for_user(&self, user_id: &str) -> Result<Vec<ScreeningRecord>>;

    /// Append a record.
    async fn insert_record(&self, record: &ScreeningRecord) -> Result<()>;
}

/// Prefix holding every record of a user.
///
/// User ids are hashed so arbitrary identifiers map onto safe object names.
pub fn records_prefix(user_id: &str) -> String {
    let digest = Sha256::digest(user_id.as_bytes());
    format!("records/{}", hex::encode(&digest[..16]))
}

/// Key of a single record.
pub fn record_key(record: &ScreeningRecord) -> String {
    format!("{}/{}.json", records_prefix(&record.user_id), record.id)
}

/// Reject keys that could escape their bucket.
pub fn check_key(bucket: &str, key: &str) -> Result<()> {
    let bad = |s: &str| {
        s.is_empty()
            || s.starts_with('/')
            || s.contains('\\')
            || s.split('/').any(|part| part.is_empty() || part == "." || part == "..")
    };
    if bad(bucket) || bucket.contains('/') {
        return Err(AppError::validation(format!("Invalid bucket name: {bucket:?}")));
    }
    if bad(key) {
        return Err(AppError::validation(format!("Invalid object key: {key:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScreeningOutput;

    #[test]
    fn test_records_prefix_is_stable_and_opaque() {
        let a = records_prefix("user-1");
        assert_eq!(a, records_prefix("user-1"));
        assert_ne!(a, records_prefix("user-2"));
        assert!(a.starts_with("records/"));
        assert!(!records_prefix("../../etc").contains(".."));
    }

    #[test]
    fn test_record_key_is_unique_per_record() {
        let output = ScreeningOutput::new(0.87, "medium");
        let a = ScreeningRecord::new("user-1", "i", "v", "e", output.clone(), 1);
        let b = ScreeningRecord::new("user-1", "i", "v", "e", output, 1);

        assert!(record_key(&a).starts_with(&format!("{}/", records_prefix("user-1"))));
        assert!(record_key(&a).ends_with(".json"));
        assert_ne!(record_key(&a), record_key(&b));
    }

    #[test]
    fn test_check_key() {
        assert!(check_key("images", "images/abc.jpg").is_ok());
        assert!(check_key("eeg", "abc.csv").is_ok());
        assert!(check_key("eeg", "../abc.csv").is_err());
        assert!(check_key("eeg", "/abc.csv").is_err());
        assert!(check_key("eeg", "a//b.csv").is_err());
        assert!(check_key("a/b", "abc.csv").is_err());
        assert!(check_key("", "abc.csv").is_err());
    }
}

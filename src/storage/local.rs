//! Local filesystem storage implementation.
//!
//! Stores intake binaries and screening records under a single root
//! directory for development and testing. Production deployments should
//! use `S3Storage`.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── {bucket}/{key}        # Uploaded binaries
//! └── records/
//!     └── {digest}/
//!         └── {id}.json     # One file per screening record
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::ScreeningRecord;
use crate::storage::{ObjectStorage, RecordStore, check_key, record_key, records_prefix};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    ///
    /// Each writer gets its own temp file, so concurrent writes never share
    /// a path.
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut tmp = path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Keys of the `.json` files directly under `prefix`, sorted.
    async fn list_json(&self, prefix: &str) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(self.path(prefix)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") {
                keys.push(format!("{prefix}/{name}"));
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String> {
        check_key(bucket, key)?;
        self.write_bytes(&format!("{bucket}/{key}"), bytes).await?;
        log::debug!(
            "Stored {} bytes ({}) at {}/{}",
            bytes.len(),
            content_type,
            bucket,
            key
        );
        Ok(key.to_string())
    }
}

#[async_trait]
impl RecordStore for LocalStorage {
    async fn count_for_user(&self, user_id: &str) -> Result<u64> {
        Ok(self.list_json(&records_prefix(user_id)).await?.len() as u64)
    }

    async fn records_for_user(&self, user_id: &str) -> Result<Vec<ScreeningRecord>> {
        let mut records = Vec::new();
        for key in self.list_json(&records_prefix(user_id)).await? {
            if let Some(record) = self.read_json::<ScreeningRecord>(&key).await? {
                if record.user_id == user_id {
                    records.push(record);
                }
            }
        }
        records.sort_by_key(|r| (r.created_at, r.test_number));
        Ok(records)
    }

    async fn insert_record(&self, record: &ScreeningRecord) -> Result<()> {
        self.write_json(&record_key(record), record).await?;
        log::info!(
            "Inserted screening record {} (test #{}) for user {}",
            record.id,
            record.test_number,
            record.user_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScreeningOutput;
    use tempfile::TempDir;

    fn record(user: &str, n: u64) -> ScreeningRecord {
        ScreeningRecord::new(
            user,
            "images/a.jpg",
            "b.mp4",
            "c.csv",
            ScreeningOutput::new(0.87, "medium"),
            n,
        )
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let data = storage.read_bytes("nope.txt").await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_put_object_nested_key() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let key = storage
            .put_object("images", "images/abc.jpg", b"jpeg", "image/jpeg")
            .await
            .unwrap();
        assert_eq!(key, "images/abc.jpg");

        let dir = tmp.path().join("images/images");
        assert_eq!(std::fs::read(dir.join("abc.jpg")).unwrap(), b"jpeg");
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_put_object_rejects_traversal() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("root"));

        let result = storage
            .put_object("eeg", "../escape.csv", b"x", "text/csv")
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(!tmp.path().join("escape.csv").exists());
    }

    #[tokio::test]
    async fn test_records_are_counted_per_user() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert_eq!(storage.count_for_user("alice").await.unwrap(), 0);

        storage.insert_record(&record("alice", 1)).await.unwrap();
        storage.insert_record(&record("alice", 2)).await.unwrap();
        storage.insert_record(&record("bob", 1)).await.unwrap();

        assert_eq!(storage.count_for_user("alice").await.unwrap(), 2);
        assert_eq!(storage.count_for_user("bob").await.unwrap(), 1);

        let alice = storage.records_for_user("alice").await.unwrap();
        let numbers: Vec<_> = alice.iter().map(|r| r.test_number).collect();
        assert_eq!(numbers, [1, 2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_keep_every_record() {
        let tmp = TempDir::new().unwrap();
        let storage = std::sync::Arc::new(LocalStorage::new(tmp.path()));

        let handles: Vec<_> = (1..=20)
            .map(|n| {
                let storage = std::sync::Arc::clone(&storage);
                tokio::spawn(async move { storage.insert_record(&record("u1", n)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(storage.count_for_user("u1").await.unwrap(), 20);
        assert_eq!(storage.records_for_user("u1").await.unwrap().len(), 20);

        let dir = tmp.path().join(records_prefix("u1"));
        let leftovers = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}

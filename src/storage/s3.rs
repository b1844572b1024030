//! AWS S3 storage implementation.
//!
//! Every logical bucket lives under one S3 bucket:
//! - Binaries are stored at `{prefix}/{bucket}/{key}`
//! - Screening records are stored at `{prefix}/records/{digest}/{id}.json`,
//!   one object per record

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{AppError, Result};
use crate::models::{ScreeningRecord, StorageConfig};
use crate::storage::{ObjectStorage, RecordStore, check_key, record_key, records_prefix};

/// S3-based object and record storage.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Create S3 storage from the storage section of the config.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&sdk_config);

        if config.bucket.trim().is_empty() {
            return Err(AppError::config("S3 bucket name is empty"));
        }

        Ok(Self::new(client, &config.bucket, &config.prefix))
    }

    /// Full object key with the configured prefix.
    fn full_key(&self, key: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", prefix, key)
        }
    }

    async fn write_bytes(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let full_key = self.full_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!(
                    "put s3://{}/{}: {}",
                    self.bucket,
                    full_key,
                    e.into_service_error()
                ))
            })?;
        Ok(())
    }

    /// Read an object by its full key, returning `None` if it is absent.
    async fn read_bytes(&self, full_key: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(full_key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output.body.collect().await.map_err(|e| {
                    AppError::storage(format!("read s3://{}/{}: {}", self.bucket, full_key, e))
                })?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::debug!("No object at s3://{}/{}", self.bucket, full_key);
                    Ok(None)
                } else {
                    Err(AppError::storage(format!(
                        "get s3://{}/{}: {}",
                        self.bucket, full_key, service_err
                    )))
                }
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, full_key: &str) -> Result<Option<T>> {
        match self.read_bytes(full_key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Full keys of the `.json` objects under `prefix`, following pagination.
    async fn list_json(&self, prefix: &str) -> Result<Vec<String>> {
        let full_prefix = format!("{}/", self.full_key(prefix));
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&full_prefix)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| {
                    AppError::storage(format!(
                        "list s3://{}/{}: {}",
                        self.bucket,
                        full_prefix,
                        e.into_service_error()
                    ))
                })?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter(|key| key.ends_with(".json"))
                    .map(str::to_string),
            );

            match output.next_continuation_token() {
                Some(next) => token = Some(next.to_string()),
                None => break,
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, bytes, "application/json").await
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String> {
        check_key(bucket, key)?;
        self.write_bytes(&format!("{bucket}/{key}"), bytes.to_vec(), content_type)
            .await?;
        log::info!(
            "Uploaded {} bytes to s3://{}/{}",
            bytes.len(),
            self.bucket,
            self.full_key(&format!("{bucket}/{key}"))
        );
        Ok(key.to_string())
    }
}

#[async_trait]
impl RecordStore for S3Storage {
    async fn count_for_user(&self, user_id: &str) -> Result<u64> {
        Ok(self.list_json(&records_prefix(user_id)).await?.len() as u64)
    }

    async fn records_for_user(&self, user_id: &str) -> Result<Vec<ScreeningRecord>> {
        let mut records = Vec::new();
        for full_key in self.list_json(&records_prefix(user_id)).await? {
            if let Some(record) = self.read_json::<ScreeningRecord>(&full_key).await? {
                if record.user_id == user_id {
                    records.push(record);
                }
            }
        }
        records.sort_by_key(|r| (r.created_at, r.test_number));
        Ok(records)
    }

    async fn insert_record(&self, record: &ScreeningRecord) -> Result<()> {
        let key = record_key(record);
        self.write_json(&key, record).await?;
        log::info!(
            "Inserted screening record {} (test #{}) into s3://{}/{}",
            record.id,
            record.test_number,
            self.bucket,
            self.full_key(&key)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{BehaviorVersion, Region};

    fn offline_client() -> Client {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        Client::from_conf(config)
    }

    #[test]
    fn test_full_key_with_prefix() {
        let storage = S3Storage::new(offline_client(), "intake", "/screening/");
        assert_eq!(storage.full_key("eeg/a.csv"), "screening/eeg/a.csv");
    }

    #[test]
    fn test_full_key_without_prefix() {
        let storage = S3Storage::new(offline_client(), "intake", "");
        assert_eq!(storage.full_key("videos/b.mp4"), "videos/b.mp4");
    }
}

//! Client side of the screening API.
//!
//! The sequencer talks to the backend through [`ScreeningApi`]:
//! - [`HttpApi`] calls a deployed backend over HTTP
//! - [`LocalApi`] calls the services in-process

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::{
    CountResponse, ErrorResponse, FILE_FIELD, FetchResultRequest, FetchResultResponse,
    UploadResponse,
};
use crate::error::{AppError, Result};
use crate::models::{ClientConfig, MediaFile, MediaKind, ScreeningOutput};
use crate::services::{AppState, ResultKeys};
use crate::utils::http;

/// Network calls made by the submission stages.
#[async_trait]
pub trait ScreeningApi: Send + Sync {
    /// Number of prior screenings for the user.
    async fn get_count(&self, user_id: &str) -> Result<u64>;

    /// Upload one binary and return its storage key.
    async fn upload(&self, kind: MediaKind, file: &MediaFile) -> Result<String>;

    /// Run the analysis and persist the screening record.
    async fn fetch_result(&self, user_id: &str, keys: &ResultKeys) -> Result<ScreeningOutput>;
}

/// HTTP implementation backed by `reqwest`.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
}

impl HttpApi {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = http::create_async_client(config)?;
        let base_url = http::base_url(&config.base_url)?;
        Ok(Self::new(client, base_url))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Decode a success body, or turn an error body into an `AppError`.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(ErrorResponse {
                error,
                kind: Some(kind),
            }) => Err(AppError::upload(kind, error)),
            Ok(ErrorResponse { error, kind: None }) => Err(AppError::api(status.as_u16(), error)),
            Err(_) => Err(AppError::api(status.as_u16(), text)),
        }
    }
}

#[async_trait]
impl ScreeningApi for HttpApi {
    async fn get_count(&self, user_id: &str) -> Result<u64> {
        let response = self
            .client
            .get(self.endpoint("get-count")?)
            .query(&[("userId", user_id)])
            .send()
            .await?;
        let body: CountResponse = Self::decode(response).await?;
        Ok(body.count)
    }

    async fn upload(&self, kind: MediaKind, file: &MediaFile) -> Result<String> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .client
            .post(self.endpoint(&format!("upload/{}", kind))?)
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = Self::decode(response).await?;
        Ok(body.key)
    }

    async fn fetch_result(&self, user_id: &str, keys: &ResultKeys) -> Result<ScreeningOutput> {
        let request = FetchResultRequest {
            image_key: Some(keys.image_key.clone()),
            video_key: Some(keys.video_key.clone()),
            eeg_key: Some(keys.eeg_key.clone()),
            user_id: Some(user_id.to_string()),
        };
        let response = self
            .client
            .post(self.endpoint("fetch-result")?)
            .json(&request)
            .send()
            .await?;
        let body: FetchResultResponse = Self::decode(response).await?;
        Ok(body.output)
    }
}

/// In-process implementation calling the backend services directly.
#[derive(Clone)]
pub struct LocalApi {
    state: AppState,
}

impl LocalApi {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ScreeningApi for LocalApi {
    async fn get_count(&self, user_id: &str) -> Result<u64> {
        self.state.screening.count(user_id).await
    }

    async fn upload(&self, kind: MediaKind, file: &MediaFile) -> Result<String> {
        self.state.uploads.upload(kind, file).await
    }

    async fn fetch_result(&self, user_id: &str, keys: &ResultKeys) -> Result<ScreeningOutput> {
        let record = self.state.screening.fetch_result(user_id, keys).await?;
        Ok(record.screening_output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::models::Config;
    use crate::storage::LocalStorage;

    #[test]
    fn test_http_endpoints_join_base_path() {
        let config = ClientConfig {
            base_url: "https://intake.example.com/api".into(),
            ..ClientConfig::default()
        };
        let api = HttpApi::from_config(&config).unwrap();
        assert_eq!(
            api.endpoint("upload/video").unwrap().as_str(),
            "https://intake.example.com/api/upload/video"
        );
    }

    #[tokio::test]
    async fn test_local_api_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let state = AppState::local(Arc::new(Config::default()), LocalStorage::new(tmp.path()));
        let api = LocalApi::new(state);

        let eeg = MediaFile::new("data.csv", "text/csv", b"t,ch1\n0,1\n".to_vec());
        let key = api.upload(MediaKind::Eeg, &eeg).await.unwrap();
        assert!(key.ends_with(".csv"));

        let keys = ResultKeys {
            image_key: "images/a.jpg".into(),
            video_key: "b.mp4".into(),
            eeg_key: key,
        };
        let output = api.fetch_result("u1", &keys).await.unwrap();
        assert_eq!(output.risk, "medium");
        assert_eq!(api.get_count("u1").await.unwrap(), 1);
    }
}

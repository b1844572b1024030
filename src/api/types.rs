// src/api/types.rs

//! Request and response bodies of the HTTP endpoints.

use serde::{Deserialize, Serialize};

use crate::error::UploadErrorKind;
use crate::models::ScreeningOutput;

/// `POST /upload/{kind}` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub key: String,
}

/// `GET /get-count` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// `POST /fetch-result` request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResultRequest {
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default)]
    pub video_key: Option<String>,
    #[serde(default)]
    pub eeg_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// `POST /fetch-result` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResultResponse {
    pub output: ScreeningOutput,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<UploadErrorKind>,
}

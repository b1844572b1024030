// src/lambda/mod.rs

//! AWS Lambda handler for the screening API.
//!
//! Accepts API Gateway REST proxy events, converts them into
//! [`ApiRequest`]s, dispatches through the API router and serializes the
//! result back into a proxy response.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::api::{self, ApiRequest, ApiResponse};
use crate::error::{AppError, Result};
use crate::services::AppState;

/// API Gateway proxy integration request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub http_method: String,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,

    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub is_base64_encoded: bool,
}

/// API Gateway proxy integration response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl TryFrom<ProxyRequest> for ApiRequest {
    type Error = AppError;

    fn try_from(event: ProxyRequest) -> Result<Self> {
        let method = Method::from_bytes(event.http_method.as_bytes()).map_err(|_| {
            AppError::validation(format!("Invalid HTTP method: {}", event.http_method))
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in event.headers.unwrap_or_default() {
            let name = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
                .map_err(|e| AppError::validation(format!("Invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| AppError::validation(format!("Invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        let body = match event.body {
            Some(body) if event.is_base64_encoded => BASE64
                .decode(body.as_bytes())
                .map_err(|e| AppError::validation(format!("Invalid base64 body: {e}")))?,
            Some(body) => body.into_bytes(),
            None => Vec::new(),
        };

        Ok(ApiRequest {
            method,
            path: event.path,
            query: event.query_string_parameters.unwrap_or_default(),
            headers,
            body,
        })
    }
}

impl From<ApiResponse> for ProxyResponse {
    fn from(response: ApiResponse) -> Self {
        let headers = HashMap::from([("content-type".to_string(), "application/json".to_string())]);
        Self {
            status_code: response.status.as_u16(),
            headers,
            body: response.body.to_string(),
            is_base64_encoded: false,
        }
    }
}

/// Main Lambda handler function.
#[instrument(skip(state, event), fields(method = %event.payload.http_method, path = %event.payload.path))]
pub async fn handler(
    state: &AppState,
    event: LambdaEvent<ProxyRequest>,
) -> std::result::Result<ProxyResponse, LambdaError> {
    let start = std::time::Instant::now();
    let (request, _context) = event.into_parts();

    let response = match ApiRequest::try_from(request) {
        Ok(request) => api::handle(state, request).await,
        Err(e) => {
            error!("Rejected malformed event: {}", e);
            ApiResponse::from_error(&e)
        }
    };

    info!(
        "Responded {} in {}ms",
        response.status.as_u16(),
        start.elapsed().as_millis()
    );
    Ok(response.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lambda_runtime::Context;
    use tempfile::TempDir;

    use super::*;
    use crate::api::multipart;
    use crate::models::Config;
    use crate::storage::LocalStorage;

    fn state(tmp: &TempDir) -> AppState {
        AppState::local(Arc::new(Config::default()), LocalStorage::new(tmp.path()))
    }

    #[test]
    fn test_proxy_request_defaults() {
        let json = r#"{"httpMethod": "GET", "path": "/get-count"}"#;
        let req: ProxyRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.http_method, "GET");
        assert!(req.query_string_parameters.is_none());
        assert!(!req.is_base64_encoded);
    }

    #[test]
    fn test_proxy_request_rejects_bad_base64() {
        let req = ProxyRequest {
            http_method: "POST".into(),
            path: "/upload/eeg".into(),
            body: Some("%%%".into()),
            is_base64_encoded: true,
            ..ProxyRequest::default()
        };
        assert!(ApiRequest::try_from(req).is_err());
    }

    #[tokio::test]
    async fn test_base64_multipart_upload() {
        let tmp = TempDir::new().unwrap();
        let state = state(&tmp);

        let form = multipart::encode_file("lambda-b", "file", "data.csv", "text/csv", b"t,c\n0,1\n");
        let request = ProxyRequest {
            http_method: "POST".into(),
            path: "/api/upload/eeg".into(),
            headers: Some(HashMap::from([(
                "Content-Type".to_string(),
                "multipart/form-data; boundary=lambda-b".to_string(),
            )])),
            body: Some(BASE64.encode(&form)),
            is_base64_encoded: true,
            ..ProxyRequest::default()
        };

        let response = handler(&state, LambdaEvent::new(request, Context::default()))
            .await
            .unwrap();

        assert_eq!(response.status_code, 200);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert!(body["key"].as_str().unwrap().ends_with(".csv"));
        assert_eq!(response.headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn test_get_count_via_query() {
        let tmp = TempDir::new().unwrap();
        let state = state(&tmp);

        let request = ProxyRequest {
            http_method: "GET".into(),
            path: "/get-count".into(),
            query_string_parameters: Some(HashMap::from([("userId".into(), "u1".into())])),
            ..ProxyRequest::default()
        };

        let response = handler(&state, LambdaEvent::new(request, Context::default()))
            .await
            .unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, r#"{"count":0}"#);
    }
}

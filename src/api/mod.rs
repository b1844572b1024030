//! Transport-agnostic HTTP API.
//!
//! Routes (also reachable under an `/api` prefix):
//!
//! - `POST /upload/{image|video|eeg}`: multipart field `file`
//! - `GET  /get-count?userId=<id>`
//! - `POST /fetch-result`: `{ imageKey, videoKey, eegKey, userId }`
//!
//! Adapters (the Lambda handler, tests) build an [`ApiRequest`], call
//! [`handle`] and serialize the returned [`ApiResponse`].

pub mod multipart;
pub mod types;

use std::collections::HashMap;

use http::{HeaderMap, Method, StatusCode, header};
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, UploadErrorKind};
use crate::models::{MediaFile, MediaKind};
use crate::services::{AppState, ResultKeys};

pub use types::{
    CountResponse, ErrorResponse, FetchResultRequest, FetchResultResponse, UploadResponse,
};

/// Header carrying the caller's user id when the body has none.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Form field holding the uploaded binary.
pub const FILE_FIELD: &str = "file";

/// An HTTP request reduced to what the handlers need.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status, body },
            Err(e) => Self::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None),
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>, kind: Option<UploadErrorKind>) -> Self {
        let body = ErrorResponse {
            error: message.into(),
            kind,
        };
        Self {
            status,
            body: serde_json::to_value(body).unwrap_or(Value::Null),
        }
    }

    /// Map an application error onto a status code and error body.
    pub fn from_error(err: &AppError) -> Self {
        match err {
            AppError::Upload { kind, message } => {
                let status = match kind {
                    UploadErrorKind::InvalidType | UploadErrorKind::TooLarge => {
                        StatusCode::BAD_REQUEST
                    }
                    UploadErrorKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
                };
                Self::error(status, message.clone(), Some(*kind))
            }
            AppError::Validation(message) => {
                Self::error(StatusCode::BAD_REQUEST, message.clone(), None)
            }
            AppError::Json(e) => {
                Self::error(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"), None)
            }
            other => {
                log::error!("Request failed: {}", other);
                Self::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    other.to_string(),
                    other.upload_kind(),
                )
            }
        }
    }
}

enum Route {
    Upload(MediaKind),
    GetCount,
    FetchResult,
}

fn route(path: &str) -> Option<Route> {
    let path = path.trim_end_matches('/');
    let path = path.strip_prefix("/api").unwrap_or(path);

    match path {
        "/get-count" => Some(Route::GetCount),
        "/fetch-result" => Some(Route::FetchResult),
        _ => path
            .strip_prefix("/upload/")
            .and_then(|segment| MediaKind::ALL.into_iter().find(|k| k.as_str() == segment))
            .map(Route::Upload),
    }
}

/// Dispatch a request to its handler.
pub async fn handle(state: &AppState, request: ApiRequest) -> ApiResponse {
    let Some(route) = route(&request.path) else {
        return ApiResponse::error(
            StatusCode::NOT_FOUND,
            format!("No route for {}", request.path),
            None,
        );
    };

    let response = match (route, &request.method) {
        (Route::Upload(kind), &Method::POST) => upload(state, kind, &request).await,
        (Route::GetCount, &Method::GET) => get_count(state, &request).await,
        (Route::FetchResult, &Method::POST) => fetch_result(state, &request).await,
        _ => ApiResponse::error(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("{} not allowed on {}", request.method, request.path),
            None,
        ),
    };

    log::info!(
        "{} {} -> {}",
        request.method,
        request.path,
        response.status.as_u16()
    );
    response
}

/// Pull the `file` field out of a multipart request.
async fn file_from_form(request: &ApiRequest) -> crate::error::Result<MediaFile> {
    let content_type = request
        .header(header::CONTENT_TYPE)
        .ok_or_else(|| AppError::validation("Content-Type header is required"))?;
    let boundary = multipart::boundary(content_type)?;

    multipart::read_file(request.body.clone(), boundary, FILE_FIELD)
        .await?
        .ok_or_else(|| AppError::validation("Form field 'file' is required"))
}

async fn upload(state: &AppState, kind: MediaKind, request: &ApiRequest) -> ApiResponse {
    let file = match file_from_form(request).await {
        Ok(file) => file,
        Err(e) => return ApiResponse::from_error(&e),
    };

    match state.uploads.upload(kind, &file).await {
        Ok(key) => ApiResponse::json(StatusCode::OK, &UploadResponse { success: true, key }),
        Err(e) => {
            log::warn!("{} upload rejected: {}", kind, e);
            ApiResponse::from_error(&e)
        }
    }
}

async fn get_count(state: &AppState, request: &ApiRequest) -> ApiResponse {
    let Some(user_id) = request.query.get("userId").filter(|u| !u.trim().is_empty()) else {
        return ApiResponse::error(StatusCode::BAD_REQUEST, "userId is required", None);
    };

    match state.screening.count(user_id).await {
        Ok(count) => ApiResponse::json(StatusCode::OK, &CountResponse { count }),
        Err(e) => ApiResponse::from_error(&e),
    }
}

async fn fetch_result(state: &AppState, request: &ApiRequest) -> ApiResponse {
    let body: FetchResultRequest = match serde_json::from_slice(&request.body) {
        Ok(body) => body,
        Err(e) => return ApiResponse::from_error(&AppError::from(e)),
    };

    let user_id = body
        .user_id
        .or_else(|| request.header(USER_ID_HEADER).map(str::to_string))
        .unwrap_or_default();
    let keys = ResultKeys {
        image_key: body.image_key.unwrap_or_default(),
        video_key: body.video_key.unwrap_or_default(),
        eeg_key: body.eeg_key.unwrap_or_default(),
    };

    match state.screening.fetch_result(&user_id, &keys).await {
        Ok(record) => ApiResponse::json(
            StatusCode::OK,
            &FetchResultResponse {
                output: record.screening_output,
            },
        ),
        Err(e) => ApiResponse::from_error(&e),
    }
}

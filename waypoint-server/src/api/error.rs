//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use waypoint_tracker::TrackerError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    StorageUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::StorageUnavailable(msg) => {
                tracing::error!("Storage error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Progress storage unavailable".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::UnknownJob(_) => ApiError::NotFound(err.to_string()),
            TrackerError::Configuration(_) | TrackerError::InvalidJobId(_) => {
                ApiError::BadRequest(err.to_string())
            }
            TrackerError::AlreadyRegistered(_) | TrackerError::JobAlreadyTerminal { .. } => {
                ApiError::Conflict(err.to_string())
            }
            TrackerError::StorageUnavailable(_) => ApiError::StorageUnavailable(err.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

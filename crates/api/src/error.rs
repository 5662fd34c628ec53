//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use trip_runtime::RuntimeError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unknown trip: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RuntimeError> for ApiError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::UnknownTrip(id) => ApiError::NotFound(id),
            RuntimeError::TripAlreadyRunning(_) => ApiError::Conflict(e.to_string()),
            RuntimeError::TripStopped(_) => ApiError::Unavailable(e.to_string()),
            RuntimeError::Frame(_) => ApiError::BadRequest(e.to_string()),
            RuntimeError::Config(_) | RuntimeError::Detector(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<event_log::LogError> for ApiError {
    fn from(e: event_log::LogError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

//! API error responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::db::DbError;
use crate::services::days::DayError;

/// Error response format for the API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: "bad_request".to_string(),
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            error: "internal_error".to_string(),
            message: message.into(),
        }
    }
}

/// Handler error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Day(#[from] DayError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidDate(_) | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Day(DayError::OutsideDay { .. } | DayError::InvalidTimestamp(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Day(DayError::Db(_)) | ApiError::Db(_) | ApiError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status.is_server_error() {
            error!(error = %self, "request failed");
            ErrorResponse::internal_error(self.to_string())
        } else {
            warn!(error = %self, "request rejected");
            ErrorResponse::bad_request(self.to_string())
        };

        (status, Json(body)).into_response()
    }
}

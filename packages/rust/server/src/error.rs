//! API errors with structured JSON bodies.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use meetnotes_shared::MeetNotesError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

/// Request-level failures mapped to HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    InsufficientSources(String),
    #[error("completion service unavailable: {message}")]
    Unavailable { message: String, retryable: bool },
    #[error("request cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, retryable) = match &self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone(), None),
            ApiError::InsufficientSources(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_SOURCES",
                detail.clone(),
                None,
            ),
            ApiError::Unavailable { message, retryable } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "COMPLETION_UNAVAILABLE",
                message.clone(),
                Some(*retryable),
            ),
            ApiError::Cancelled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CANCELLED",
                "server is shutting down".to_string(),
                Some(true),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "an internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                retryable,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<MeetNotesError> for ApiError {
    fn from(err: MeetNotesError) -> Self {
        match err {
            MeetNotesError::Validation { message } => ApiError::BadRequest(message),
            e @ MeetNotesError::InsufficientSources { .. } => ApiError::InsufficientSources(e.to_string()),
            MeetNotesError::CompletionUnavailable { reason, retryable } => ApiError::Unavailable {
                message: reason,
                retryable,
            },
            MeetNotesError::Cancelled => ApiError::Cancelled,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

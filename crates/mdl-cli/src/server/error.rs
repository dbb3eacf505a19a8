use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use mdl_core::files::FilesError;
use mdl_core::manager::SubmitError;
use mdl_core::url_model::InvalidUrl;
use mdl_core::{ConcurrencyLimitReached, EngineError};

/// Error type for HTTP handlers.
///
/// Every variant renders as `{"success": false, "error": "<message>"}` with
/// the status code below.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body or unusable input (400).
    #[error("{0}")]
    BadRequest(String),

    /// Unknown task id (404).
    #[error("{0}")]
    NotFound(String),

    /// Path refused by the downloads directory guard (403).
    #[error("{0}")]
    Forbidden(String),

    /// Concurrency ceiling reached (429).
    #[error(transparent)]
    Busy(#[from] ConcurrencyLimitReached),

    /// The engine could not fetch metadata (500, sanitized message).
    #[error("{0}")]
    Engine(String),

    /// Anything else (500, generic message).
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Busy(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Engine(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        let body = json!({
            "success": false,
            "error": message,
        });
        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<InvalidUrl> for ApiError {
    fn from(err: InvalidUrl) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Rejected(limit) => ApiError::Busy(limit),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        tracing::warn!("engine error: {}", err);
        ApiError::Engine(err.user_message())
    }
}

impl From<FilesError> for ApiError {
    fn from(err: FilesError) -> Self {
        match err {
            FilesError::OutsideDownloadsDir => ApiError::Forbidden(err.to_string()),
            FilesError::IsDirectory => ApiError::BadRequest(err.to_string()),
            FilesError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}

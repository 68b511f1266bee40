//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use blippy_runtime::RuntimeError;
use blippy_store::StoreError;

/// Errors surfaced by the HTTP API as JSON `{error}` bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller input is invalid.
    #[error("{0}")]
    BadRequest(String),

    /// The referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The conversation already has an in-flight turn.
    #[error("{0}")]
    Conflict(String),

    /// Anything the caller cannot fix.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        if e.is_not_found() {
            Self::NotFound(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<RuntimeError> for ApiError {
    fn from(e: RuntimeError) -> Self {
        match &e {
            RuntimeError::Busy(_) => Self::Conflict(e.to_string()),
            RuntimeError::MaxDepthExceeded { .. } => Self::BadRequest(e.to_string()),
            _ if e.is_not_found() => Self::NotFound(e.to_string()),
            _ => Self::Internal(e.to_string()),
        }
    }
}

/// Convenience alias for handler results.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

//! Error handling module
//!
//! Application-level error types and HTTP response conversion for the
//! read-side routes. Transfer failures never pass through here: the engine
//! classifies them into `TransferResult` itself.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AccountNotFound(id) => AppError::AccountNotFound(id.to_string()),
            other => AppError::Store(other),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "account_not_found"),
            AppError::Store(e) => {
                tracing::error!("storage error: {:?}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

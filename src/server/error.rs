//! server::error
//!
//! Mapping of request failures to HTTP responses.
//!
//! Response bodies are fixed strings. Anything more specific is logged and
//! never sent to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::store::StoreError;

/// A failed request.
#[derive(Debug)]
pub enum AppError {
    /// No identity was forwarded and anonymous editing is off.
    Unauthenticated,
    /// The page does not exist or its path is invalid.
    NotFound(String),
    /// Anything else.
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DocumentNotFound { .. } | StoreError::InvalidPath(_) => {
                AppError::NotFound(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("store task failed: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthenticated => {
                tracing::debug!("rejecting request without identity");
                (StatusCode::UNAUTHORIZED, "unauthenticated!").into_response()
            }
            AppError::NotFound(detail) => {
                tracing::warn!(%detail, "page was not found");
                (StatusCode::NOT_FOUND, "The requested page was not found").into_response()
            }
            AppError::Internal(detail) => {
                tracing::error!(%detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "system error").into_response()
            }
        }
    }
}

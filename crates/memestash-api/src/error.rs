//! HTTP error response conversion.
//!
//! Wrapper around `AppError` so it can implement axum's `IntoResponse`.
//! The transport collapses token failures and traversal attempts into a
//! uniform 403 and never echoes internal detail; the distinct variants
//! still reach the logs so the three denial kinds remain observable.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use memestash_core::AppError;

#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        match &self.0 {
            AppError::InvalidToken(e) => {
                tracing::info!(reason = %e, "asset request rejected: bad token");
            }
            AppError::PathTraversal(name) => {
                tracing::warn!(asset = %name, "asset request rejected: traversal attempt");
            }
            AppError::AssetNotFound(name) => {
                tracing::info!(asset = %name, "asset request rejected: missing file");
            }
            other => {
                tracing::error!(error = %other, "asset request failed");
            }
        }

        let (status, body) = match &self.0 {
            AppError::InvalidToken(_) | AppError::PathTraversal(_) => {
                (StatusCode::FORBIDDEN, "Forbidden")
            }
            AppError::AssetNotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        };
        (status, body).into_response()
    }
}

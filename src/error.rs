//! Application error types with Axum response mapping.
//!
//! Each variant maps to a specific HTTP status + JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::handover::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Handover protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Protocol(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> serde_json::Value {
        match self {
            AppError::Protocol(e) => json!({
                "error": "Handover protocol error",
                "message": e.to_string(),
            }),
            AppError::UpstreamUnavailable(msg) => json!({
                "error": "Upstream unavailable",
                "message": msg,
            }),
            // Internal details stay in the logs.
            AppError::Internal(_) => json!({"error": "Internal error"}),
            other => json!({"error": other.to_string()}),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(ref msg) = self {
            tracing::error!(error = %msg, "internal error");
        }
        (self.status(), axum::Json(self.body())).into_response()
    }
}

//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use vta_core::AppError;

/// An error rendered as `{"error": {"type", "message"}}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error_type: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error_type,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "malformed_query", message)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let (status, error_type) = match &err {
            AppError::MalformedQuery(_) => (StatusCode::BAD_REQUEST, "malformed_query"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Llm(_) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error"),
            AppError::Ingest(_) => (StatusCode::BAD_GATEWAY, "ingest_failure"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            AppError::Prompt(_) => (StatusCode::INTERNAL_SERVER_ERROR, "prompt_error"),
            AppError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error"),
            AppError::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        Self::new(status, error_type, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{} ({})", self.message, self.status);
        } else {
            tracing::debug!("{} ({})", self.message, self.status);
        }

        let body = Json(json!({
            "error": {
                "type": self.error_type,
                "message": self.message,
            }
        }));

        (self.status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

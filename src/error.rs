//! Error types for the request path, the backends and result delivery.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::utils::http::HttpResponse;

/// Rejection of an incoming request. The task is never enqueued.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Unavailable(String),
}

impl ValidationError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::NotFound(_) => StatusCode::NOT_FOUND,
            ValidationError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ValidationError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ValidationError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// gRPC-style name of the condition, used as the response message.
    pub fn code_name(&self) -> &'static str {
        match self {
            ValidationError::NotFound(_) => "NOT_FOUND",
            ValidationError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ValidationError::Unauthenticated(_) => "UNAUTHENTICATED",
            ValidationError::Unavailable(_) => "UNAVAILABLE",
        }
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = HttpResponse::new(
            status.as_u16(),
            self.code_name().to_string(),
            self.to_string(),
        );
        (status, Json(body)).into_response()
    }
}

/// Failure inside a transcription backend or the extraction routine.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Unsupported language: {}", .0.as_deref().unwrap_or("<none>"))]
    UnsupportedLanguage(Option<String>),

    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub fn unsupported(language: Option<&str>) -> Self {
        Self::UnsupportedLanguage(language.map(str::to_string))
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }
}

/// Failure to hand a result to the downstream receiver. Never retried.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("receiver unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("receiver at {url} rejected result with status {status}")]
    Rejected { url: String, status: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_status_codes() {
        assert_eq!(ValidationError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ValidationError::invalid_argument("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ValidationError::Unauthenticated("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ValidationError::not_found("x").code_name(), "NOT_FOUND");
    }

    #[test]
    fn test_unsupported_language_message() {
        assert_eq!(BackendError::unsupported(Some("fr")).to_string(), "Unsupported language: fr");
        assert_eq!(BackendError::unsupported(None).to_string(), "Unsupported language: <none>");
    }
}

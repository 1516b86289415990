use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

// Limiter construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("max_requests must be greater than zero")]
    ZeroCapacity,
    #[error("rate limit window must be longer than zero seconds")]
    ZeroWindow,
    #[error("invalid {class} limiter: {source}")]
    Class {
        class: &'static str,
        #[source]
        source: Box<RateLimitError>,
    },
}

// Errors surfaced to HTTP clients
#[derive(Error, Debug)]
pub enum AppError {
    #[error("unknown rate limit class: {0}")]
    UnknownClass(String),
    #[error("identifier must not be empty")]
    EmptyIdentifier,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::UnknownClass(_) => (StatusCode::BAD_REQUEST, "unknown_class"),
            AppError::EmptyIdentifier => (StatusCode::BAD_REQUEST, "empty_identifier"),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        let body = Json(serde_json::json!({
            "error": code,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

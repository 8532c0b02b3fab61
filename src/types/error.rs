use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::types::problem_details::ProblemDetails;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// A broken concurrency or lifecycle contract, never caused by the peer.
    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title, cause, detail) = match self {
            AppError::ConfigError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration Error",
                "SYSTEM_FAILURE",
                msg.clone(),
            ),
            AppError::NotFound(ref msg) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                "UNSUPPORTED_EAP_TYPE",
                msg.clone(),
            ),
            AppError::BadRequest(ref msg) => (
                StatusCode::BAD_REQUEST,
                "Bad Request",
                "INVALID_EAP_PAYLOAD",
                msg.clone(),
            ),
            AppError::Invariant(ref msg) => {
                tracing::error!("Invariant violation: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "SYSTEM_FAILURE",
                    "internal invariant violated".to_string(),
                )
            }
        };

        let problem_details = ProblemDetails::new(status.as_u16(), title, &detail).with_cause(cause);

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/problem+json")],
            Json(problem_details),
        )
            .into_response()
    }
}

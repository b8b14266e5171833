//! Error types for the mock API.
//!
//! [`MockApiError`] implements [`axum::response::IntoResponse`] so handlers
//! can return `Result<…, MockApiError>` directly. Every error body uses the
//! platform's failure envelope `{ "success": false, "message": … }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failure modes of the mock handlers.
#[derive(Debug, thiserror::Error)]
pub enum MockApiError {
    /// Missing, unknown or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// The addressed record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Malformed parameters.
    #[error("{0}")]
    BadRequest(String),

    /// Simulated upstream outage.
    #[error("{0}")]
    Unavailable(String),
}

impl IntoResponse for MockApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        tracing::debug!(%status, error = %self, "request failed");
        (
            status,
            Json(json!({ "success": false, "message": self.to_string() })),
        )
            .into_response()
    }
}

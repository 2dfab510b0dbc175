use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to HTTP clients.
///
/// `Clone` so a single upstream failure can be shared with every caller
/// waiting on the same in-flight search.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// Missing or malformed request parameter
    #[error("{0}")]
    InvalidInput(String),

    /// Search backend failed or returned an unusable result
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// Stream resolver failed or returned an unusable result
    #[error("Failed to get video info: {0}")]
    StreamInfoFailed(String),

    /// Request origin is not in the allow-list
    #[error("Origin not allowed: {0}")]
    AccessDenied(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            RelayError::InvalidInput(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            RelayError::SearchFailed(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Search failed", "details": details }),
            ),
            // Resolver details may carry signed stream URLs; keep them in logs only
            RelayError::StreamInfoFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to get video info" }),
            ),
            RelayError::AccessDenied(_) => {
                (StatusCode::FORBIDDEN, json!({ "error": "Not allowed by CORS" }))
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

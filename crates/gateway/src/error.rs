//! Failures produced by the gateway itself, rendered as a status plus a
//! `{"error": ...}` body.

use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde_json::json,
    thiserror::Error,
    tracing::error,
};

/// Errors produced by the gateway itself. Backend error statuses are not
/// errors here; they are relayed as-is.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing API path")]
    MissingPath,

    #[error("invalid upstream target: {0}")]
    InvalidTarget(#[from] url::ParseError),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::MissingPath => (StatusCode::NOT_FOUND, "Missing API path"),
            Self::InvalidTarget(e) => {
                error!(error = %e, "could not resolve upstream target");
                (StatusCode::BAD_REQUEST, "Invalid API path")
            },
            Self::Upstream(e) => {
                error!(error = %e, "upstream request failed");
                (StatusCode::BAD_GATEWAY, "Upstream request failed")
            },
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

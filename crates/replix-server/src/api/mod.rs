//! HTTP handlers
//!
//! Core errors are mapped onto status codes here so every handler can use
//! `?` and still produce a `{"error", "kind"}` body.

pub mod cache;
pub mod health;
pub mod query;
pub mod replicate;
pub mod stats;
pub mod write;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human readable message
    pub error: String,
    /// Stable error kind
    pub kind: String,
}

/// Error type returned by handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body could not be decoded
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Failure reported by the proxy, log or coordinator
    #[error(transparent)]
    Core(#[from] replix_core::Error),
}

impl ApiError {
    /// Status code for this error
    pub fn status(&self) -> StatusCode {
        use replix_core::Error;

        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(e) => match e {
                Error::PoolExhausted { .. } | Error::ConnectionUnavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
                Error::PartialReplication { .. } => StatusCode::GATEWAY_TIMEOUT,
                Error::Configuration(_)
                | Error::Durability(_)
                | Error::Io(_)
                | Error::Serialization(_)
                | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Core(e) => e.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "Request failed: {}", self);
        } else {
            tracing::debug!(kind = self.kind(), "Request rejected: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                kind: self.kind().to_string(),
            }),
        )
            .into_response()
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

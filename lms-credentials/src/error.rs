//! Error types for lms-credentials

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Remote API client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status} from {url}: {body}")]
    Api { status: u16, url: String, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Whether repeating the same request could succeed
    ///
    /// Transport failures, 5xx, 408 and 429 are transient. A bad base URL,
    /// an undecodable body and other 4xx responses will fail the same way
    /// on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Api { status, .. } => !(400..500).contains(status) || *status == 408 || *status == 429,
            ClientError::Parse(_) | ClientError::InvalidUrl(_) => false,
        }
    }
}

/// Id token issuance errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("No OAuth client registered with name '{0}'")]
    UnknownClient(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Failures that abort a reconciliation run
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No user with that username; never retried
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] lms_common::Error),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Remote API error: {0}")]
    Client(#[from] ClientError),
}

impl ReconcileError {
    /// Whether a later attempt could succeed
    ///
    /// Missing users and configuration faults (unknown OAuth client, bad
    /// service URL, 4xx from a remote API) are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::UserNotFound(_) | ReconcileError::Token(_) => false,
            ReconcileError::Store(_) => true,
            ReconcileError::Client(e) => e.is_retryable(),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Queue closed or full (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg)
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

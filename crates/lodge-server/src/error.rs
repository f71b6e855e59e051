//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Session resolution or identity handling failed.
    #[error("Session error: {0}")]
    Session(#[from] lodge_session::Error),

    /// The session middleware did not run for this request.
    #[error("No session attached to request")]
    MissingSession,

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::Session(lodge_session::Error::Identity(_)) => {
                (StatusCode::UNAUTHORIZED, "identity_error")
            }
            ServerError::Session(_) => (StatusCode::INTERNAL_SERVER_ERROR, "session_error"),
            ServerError::MissingSession => (StatusCode::INTERNAL_SERVER_ERROR, "missing_session"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };

        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let response = ServerError::BadRequest("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            ServerError::Session(lodge_session::Error::RandomnessUnavailable("x".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let identity = std::io::Error::other("wrong password");
        let response =
            ServerError::Session(lodge_session::Error::Identity(Box::new(identity)))
                .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = ServerError::MissingSession.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

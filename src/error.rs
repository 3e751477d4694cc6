use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ErrorBody;

/// ApiError
///
/// Failures reported while talking to the external verification API.
/// The only distinction the portal acts on is session failure (redirect to
/// sign-in) versus everything else (inline, retryable message).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("session rejected by the verification API")]
    Unauthorized,

    #[error("verification API responded with status {0}")]
    Status(u16),

    #[error("verification API unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_session_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// SessionError
///
/// Failures of the session store itself (not of the subject's credentials).
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// PortalError
///
/// Errors that escape a page handler. Page flows never produce these for
/// API failures; they only surface when session state cannot be read or written.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let body = ErrorBody {
            error: "The portal could not load your session. Please try again.".to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

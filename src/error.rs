//! Error taxonomy for the relay and its translation into HTTP responses.
//!
//! Every failure terminates the request and maps 1:1 onto an outward status:
//! - transport failures and anything unexpected surface as `500`
//! - panel rejections keep the panel's own status and body
//! - a login that yields no session surfaces as `403`
//! - malformed caller input surfaces as `422` (or the body rejection's own status)

use std::fmt;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Which of the two panel calls a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStage {
    Login,
    AddClient,
}

impl PanelStage {
    fn label(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::AddClient => "Add client",
        }
    }
}

/// Errors that can occur while relaying a provisioning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The panel could not be reached (DNS, TLS, refused, timeout).
    Transport { stage: PanelStage, message: String },

    /// The panel answered with a non-success status.
    PanelRejection {
        stage: PanelStage,
        status: u16,
        body: String,
    },

    /// Login succeeded at the HTTP level but no session cookie was issued.
    AuthenticationRejected,

    /// The caller-supplied email cannot be used as a client label.
    InvalidEmail(String),

    /// The request body could not be read as an `{"email": ...}` object.
    InvalidBody { status: u16, message: String },

    /// Anything else.
    Internal(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { stage, message } => {
                write!(f, "{} error: {}", stage.label(), message)
            }
            Self::PanelRejection { stage, body, .. } => {
                write!(f, "{} failed: {}", stage.label(), body)
            }
            Self::AuthenticationRejected => {
                write!(f, "Login failed: No 3x-ui cookie received")
            }
            Self::InvalidEmail(reason) => write!(f, "Invalid email: {}", reason),
            Self::InvalidBody { message, .. } => write!(f, "Invalid request body: {}", message),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for RelayError {}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

impl From<anyhow::Error> for RelayError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<JsonRejection> for RelayError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody {
            status: rejection.status().as_u16(),
            message: rejection.body_text(),
        }
    }
}

impl RelayError {
    pub(crate) fn transport(stage: PanelStage, err: reqwest::Error) -> Self {
        Self::Transport {
            stage,
            message: err.to_string(),
        }
    }

    /// Outward HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PanelRejection { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::InvalidBody { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            Self::AuthenticationRejected => StatusCode::FORBIDDEN,
            Self::InvalidEmail(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transport { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body, shaped `{"detail": "..."}` for compatibility with existing callers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        } else {
            tracing::warn!(status = status.as_u16(), "{}", self);
        }

        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

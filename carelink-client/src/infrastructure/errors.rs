//! Errors surfaced by the request client and the domain calls built on it.

use reqwest::StatusCode;
use thiserror::Error;

/// Failures of an authenticated API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected locally before any network I/O
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No credential present; nothing was sent
    #[error("Not signed in")]
    Unauthenticated,

    /// Refresh failed or the backend rejected the refreshed credential.
    /// The local session has been cleared.
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// Network-level failure (connection refused, DNS, TLS, reset)
    #[error("Backend unreachable: {0}")]
    BackendUnreachable(#[source] reqwest::Error),

    #[error("Request timed out")]
    TimedOut,

    /// Caller cancelled the call; no retry was attempted
    #[error("Request cancelled")]
    Cancelled,

    /// Non-2xx response carrying the server's explanation
    #[error("{message}")]
    Application { status: StatusCode, message: String },

    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request body")]
    Encode(#[source] serde_json::Error),
}

impl ApiError {
    /// The UI should drop back to the sign-in screen.
    pub fn is_sign_out_trigger(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// The failure is about reaching the backend, not about the request.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ApiError::BackendUnreachable(_) | ApiError::TimedOut)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Application { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::TimedOut
        } else {
            ApiError::BackendUnreachable(err)
        }
    }
}

/// Client-side payload validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "Unsupported file type '{mime}'. Allowed: JPEG, PNG, WebP images or PDF"
    )]
    UnsupportedFileType { mime: String },

    #[error("File is {size} bytes; the limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("File is empty")]
    EmptyFile,

    #[error("{0} is required")]
    MissingField(&'static str),
}

pub type ApiResult<T> = Result<T, ApiError>;

//! Authentication error types
//!
//! Session-level failures (login, refresh, local persistence) use
//! [`AuthError`]. Refresh failures are shared between every caller waiting
//! on the same in-flight refresh, so they get their own cloneable
//! [`RefreshError`].

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Main authentication error type
#[derive(Debug, Error)]
pub enum AuthError {
    /// Identity or secret was empty
    #[error("Missing credentials: {0} is required")]
    MissingCredentials(&'static str),

    /// Backend answered the login with a non-success status
    #[error("{message}")]
    LoginRejected { status: StatusCode, message: String },

    /// Network-level failure; the backend was never reached
    #[error("Backend unreachable: {0}")]
    BackendUnreachable(#[source] reqwest::Error),

    /// Backend replied with a body that does not match the contract
    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    /// Token refresh failed
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// Local session storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            AuthError::BackendUnreachable(_)
                | AuthError::Refresh(RefreshError::Unreachable(_))
        )
    }
}

/// Outcome of a failed refresh, observed by every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("Refresh token missing")]
    NoRefreshToken,

    #[error("Token refresh rejected with status {0}")]
    Rejected(StatusCode),

    #[error("Token refresh failed, backend unreachable: {0}")]
    Unreachable(String),

    #[error("Token refresh returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to persist refreshed token: {0}")]
    Storage(String),

    #[error("Token refresh task failed: {0}")]
    Interrupted(String),
}

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read session file {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write session file {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupted session file {path}")]
    CorruptedData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No credential stored")]
    NoCredential,
}

/// Result type alias for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type alias for credential store operations
pub type StorageResult<T> = Result<T, StorageError>;

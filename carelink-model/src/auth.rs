use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::user::UserProfile;

/// Access/refresh token pair.
///
/// Both halves always travel together; a credential never exists with only
/// one of the two tokens. Secrets are wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    access_token: String,
    refresh_token: String,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Pair with the access token swapped out and the refresh token kept.
    pub fn with_access_token(&self, access_token: impl Into<String>) -> Self {
        Self::new(access_token, self.refresh_token.clone())
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Login body. Providers and patients use different identity fields and
/// different endpoints.
#[derive(Clone, Serialize)]
#[serde(untagged)]
pub enum LoginRequest {
    Provider {
        email: String,
        password: String,
    },
    #[serde(rename_all = "camelCase")]
    Patient {
        patient_id: String,
        password: String,
    },
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginRequest::Provider { email, .. } => f
                .debug_struct("Provider")
                .field("email", email)
                .finish_non_exhaustive(),
            LoginRequest::Patient { patient_id, .. } => f
                .debug_struct("Patient")
                .field("patient_id", patient_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Successful login payload.
///
/// Every field is optional on the wire so that a 2xx response with
/// `success: false` can still be decoded and turned into a rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

impl LoginResponse {
    /// Split into the pieces a session needs, or `None` if the response
    /// does not describe a complete session.
    pub fn into_session(self) -> Option<(Credential, UserProfile)> {
        if !self.success {
            return None;
        }
        match (self.access_token, self.refresh_token, self.user) {
            (Some(access), Some(refresh), Some(user))
                if !access.is_empty() && !refresh.is_empty() =>
            {
                Some((Credential::new(access, refresh), user))
            }
            _ => None,
        }
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest").finish_non_exhaustive()
    }
}

/// `/auth/refresh` response. A present `refresh_token` means the backend
/// rotated it; an absent one means the old refresh token stays valid.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for RefreshResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshResponse")
            .field("rotated", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a signed-in account as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Nurse,
    Admin,
    Support,
    Patient,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Admin => "admin",
            Role::Support => "support",
            Role::Patient => "patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which login flow an account belongs to.
///
/// Providers sign in with an email address, patients with their patient
/// identifier. The two flows hit different endpoints but produce the same
/// session shape.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    Provider,
    Patient,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Provider => f.write_str("provider"),
            AccountKind::Patient => f.write_str("patient"),
        }
    }
}

/// Profile of the signed-in account.
///
/// Cached locally as an advisory copy; a fresh `/auth/me` response always
/// wins over the cached value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "name")]
    pub display_name: String,
    pub role: Role,
    #[serde(
        default,
        alias = "patientId",
        skip_serializing_if = "Option::is_none"
    )]
    pub patient_link_id: Option<String>,
    #[serde(default, alias = "userType")]
    pub account_kind: AccountKind,
    #[serde(
        default,
        alias = "lastLogin",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn is_patient(&self) -> bool {
        self.account_kind == AccountKind::Patient || self.role == Role::Patient
    }
}

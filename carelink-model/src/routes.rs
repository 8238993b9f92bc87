//! Route definitions of the clinical backend.
//!
//! Paths are relative to the configured API base URL. Templates use
//! `{id}` placeholders; fill them with [`with_id`].

pub const HEALTH: &str = "/health";

pub mod auth {
    pub const LOGIN: &str = "/auth/login";
    pub const PATIENT_LOGIN: &str = "/auth/patient/login";
    pub const LOGOUT: &str = "/auth/logout";
    pub const ME: &str = "/auth/me";
    pub const REFRESH: &str = "/auth/refresh";
}

pub mod patients {
    pub const TEST_REPORT_UPLOAD: &str = "/patients/{id}/test-reports/upload";
    pub const PRESCRIPTION_UPLOAD: &str =
        "/patients/{id}/prescriptions/upload";
    pub const VISIT_NOTE_GENERATE: &str =
        "/patients/{id}/visit-notes/generate";
}

pub mod symptoms {
    pub const ANALYZE: &str = "/symptoms/analyze";
}

/// Substitute `{id}` in a route template with a percent-encoded identifier.
pub fn with_id(template: &str, id: &str) -> String {
    template.replace("{id}", &urlencoding::encode(id))
}

//! Data shapes shared by every carelink crate.
//!
//! Everything here mirrors the JSON contract of the clinical backend. The
//! types carry no behaviour beyond (de)serialization and a few helpers for
//! extracting values out of loosely-shaped server responses.
#![allow(missing_docs)]

pub mod auth;
pub mod clinical;
pub mod envelope;
pub mod error;
pub mod routes;
pub mod user;

// Intentionally curated re-exports for downstream consumers.
pub use auth::{
    Credential, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
};
pub use clinical::{
    DrugInteraction, InteractionCheck, Medication, ModelPrediction,
    PatientContext, PrescriptionAnalysis, ReportAnalysis, Severity,
    SymptomAnalysis, SymptomAnalysisRequest, TestResult, VisitNote,
    VisitNoteRequest,
};
pub use envelope::Payload;
pub use error::ErrorBody;
pub use user::{AccountKind, Role, UserProfile};

//! Typed calls to the clinical endpoints.
//!
//! Each call validates its payload before touching the network and then
//! goes through [`ApiClient`](crate::infrastructure::ApiClient), so uploads
//! and analyses get the same refresh-and-replay handling as any other
//! request. The `*_request` builders are public for callers that need
//! [`ApiClient::execute_json_cancellable`](crate::infrastructure::ApiClient::execute_json_cancellable).

pub mod prescriptions;
pub mod reports;
pub mod symptoms;
pub mod upload;
pub mod visit_notes;

pub use prescriptions::prescription_request;
pub use reports::test_report_request;
pub use symptoms::symptom_request;
pub use upload::{ALLOWED_CONTENT_TYPES, FileUpload, MAX_UPLOAD_BYTES};
pub use visit_notes::visit_note_request;

use carelink_model::{VisitNote, VisitNoteRequest, routes};

use super::reports::require_patient_id;
use crate::infrastructure::errors::{ApiResult, ValidationError};
use crate::infrastructure::{ApiClient, ApiRequest};

pub fn visit_note_request(patient_id: &str, body: &VisitNoteRequest) -> ApiResult<ApiRequest> {
    let patient_id = require_patient_id(patient_id)?;
    if body.doctor_input.trim().is_empty() {
        return Err(ValidationError::MissingField("doctor input").into());
    }
    let path = routes::with_id(routes::patients::VISIT_NOTE_GENERATE, patient_id);
    ApiRequest::post(path).json(body)
}

impl ApiClient {
    /// Turn free-form doctor notes into a structured visit note.
    pub async fn generate_visit_note(
        &self,
        patient_id: &str,
        body: &VisitNoteRequest,
    ) -> ApiResult<VisitNote> {
        let request = visit_note_request(patient_id, body)?;
        self.execute_json(&request).await
    }
}

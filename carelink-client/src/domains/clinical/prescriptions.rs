use carelink_model::{PrescriptionAnalysis, routes};
use log::info;

use super::reports::require_patient_id;
use super::upload::FileUpload;
use crate::infrastructure::errors::ApiResult;
use crate::infrastructure::{ApiClient, ApiRequest};

/// Validated upload request for a prescription scan.
pub fn prescription_request(patient_id: &str, file: FileUpload) -> ApiResult<ApiRequest> {
    let patient_id = require_patient_id(patient_id)?;
    file.validate()?;
    let path = routes::with_id(routes::patients::PRESCRIPTION_UPLOAD, patient_id);
    Ok(ApiRequest::post(path).multipart(file))
}

impl ApiClient {
    /// Upload a prescription; the backend extracts medications and checks
    /// interactions.
    pub async fn upload_prescription(
        &self,
        patient_id: &str,
        file: FileUpload,
    ) -> ApiResult<PrescriptionAnalysis> {
        let request = prescription_request(patient_id, file)?;
        info!("[ApiClient] Uploading prescription for patient {}", patient_id.trim());
        self.execute_json(&request).await
    }
}

use carelink_model::{ReportAnalysis, routes};
use log::info;

use super::upload::FileUpload;
use crate::infrastructure::errors::{ApiResult, ValidationError};
use crate::infrastructure::{ApiClient, ApiRequest};

pub(super) fn require_patient_id(patient_id: &str) -> Result<&str, ValidationError> {
    let trimmed = patient_id.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("patient id"));
    }
    Ok(trimmed)
}

/// Validated upload request for a lab/test report scan.
pub fn test_report_request(patient_id: &str, file: FileUpload) -> ApiResult<ApiRequest> {
    let patient_id = require_patient_id(patient_id)?;
    file.validate()?;
    let path = routes::with_id(routes::patients::TEST_REPORT_UPLOAD, patient_id);
    Ok(ApiRequest::post(path).multipart(file))
}

impl ApiClient {
    /// Upload a test report for OCR and analysis.
    pub async fn upload_test_report(
        &self,
        patient_id: &str,
        file: FileUpload,
    ) -> ApiResult<ReportAnalysis> {
        let request = test_report_request(patient_id, file)?;
        info!("[ApiClient] Uploading test report for patient {}", patient_id.trim());
        self.execute_json(&request).await
    }
}

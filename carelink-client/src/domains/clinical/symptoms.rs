use carelink_model::{SymptomAnalysis, SymptomAnalysisRequest, routes};

use crate::infrastructure::errors::{ApiResult, ValidationError};
use crate::infrastructure::{ApiClient, ApiRequest};

pub fn symptom_request(body: &SymptomAnalysisRequest) -> ApiResult<ApiRequest> {
    if body.symptom_description.trim().is_empty() {
        return Err(ValidationError::MissingField("symptom description").into());
    }
    ApiRequest::post(routes::symptoms::ANALYZE).json(body)
}

impl ApiClient {
    pub async fn analyze_symptoms(
        &self,
        body: &SymptomAnalysisRequest,
    ) -> ApiResult<SymptomAnalysis> {
        let request = symptom_request(body)?;
        self.execute_json(&request).await
    }
}

//! Clinical payloads produced by the analysis endpoints.
//!
//! The backend runs OCR and language-model analysis server-side; the shapes
//! below are what it hands back. Fields the backend may omit default to
//! empty values so that partially-filled analyses still decode.

use serde::{Deserialize, Serialize};

/// Severity classification attached to a lab value or an alert.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub fn needs_attention(self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

/// Optional context forwarded to the analysis endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medications: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    #[serde(alias = "testName")]
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub normal_range: Option<String>,
    #[serde(default, alias = "status")]
    pub severity: Severity,
}

/// Output of the (future) trained risk model, when the backend has one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPrediction {
    pub label: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAnalysis {
    #[serde(default)]
    pub report_id: Option<String>,
    #[serde(default)]
    pub tests: Vec<TestResult>,
    #[serde(default, alias = "aiSummary")]
    pub summary: Option<String>,
    #[serde(default)]
    pub prediction: Option<ModelPrediction>,
    #[serde(default)]
    pub alerts: Vec<String>,
}

impl ReportAnalysis {
    pub fn flagged_tests(&self) -> impl Iterator<Item = &TestResult> {
        self.tests.iter().filter(|t| t.severity.needs_attention())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugInteraction {
    #[serde(default)]
    pub drugs: Vec<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionCheck {
    #[serde(default)]
    pub has_interactions: bool,
    #[serde(default)]
    pub interactions: Vec<DrugInteraction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionAnalysis {
    #[serde(default)]
    pub prescription_id: Option<String>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default, alias = "drugInteractions")]
    pub interaction_check: InteractionCheck,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomAnalysisRequest {
    pub symptom_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_context: Option<PatientContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomAnalysis {
    #[serde(default)]
    pub possible_conditions: Vec<String>,
    #[serde(default)]
    pub recommended_tests: Vec<String>,
    #[serde(default)]
    pub urgency: Severity,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitNoteRequest {
    pub doctor_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_context: Option<PatientContext>,
}

/// Structured (SOAP) visit note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitNote {
    #[serde(default)]
    pub subjective: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub assessment: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub follow_up: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_analysis_tolerates_missing_sections() {
        let report: ReportAnalysis = serde_json::from_value(json!({
            "tests": [
                { "testName": "Hemoglobin", "value": 9.1, "unit": "g/dL", "status": "low" },
                { "name": "Potassium", "value": 6.4, "severity": "critical" }
            ],
            "aiSummary": "Anaemia with hyperkalaemia"
        }))
        .expect("report decodes");

        assert_eq!(report.tests.len(), 2);
        assert!(report.prediction.is_none());
        assert!(report.alerts.is_empty());
        let flagged: Vec<_> =
            report.flagged_tests().map(|t| t.name.as_str()).collect();
        assert_eq!(flagged, vec!["Potassium"]);
    }

    #[test]
    fn symptom_request_omits_absent_context() {
        let body = serde_json::to_value(SymptomAnalysisRequest {
            symptom_description: "fever".into(),
            patient_context: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "symptomDescription": "fever" }));
    }
}

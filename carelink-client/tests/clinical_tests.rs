//! Clinical uploads and analyses through the authenticated client

mod common;

use carelink_client::domains::clinical::{FileUpload, MAX_UPLOAD_BYTES};
use carelink_client::{ApiClient, ApiError, ValidationError};
use carelink_model::{AccountKind, Severity, VisitNoteRequest};
use common::{Counters, DOCTOR_EMAIL, MockServer, PASSWORD, PATIENT_ID};

async fn signed_in(server: &MockServer) -> ApiClient {
    let (client, _store) = server.client();
    client
        .session()
        .login(DOCTOR_EMAIL, PASSWORD, AccountKind::Provider)
        .await
        .unwrap();
    client
}

fn pdf(len: usize) -> FileUpload {
    FileUpload::new("cbc-panel.pdf", "application/pdf", vec![b'%'; len])
}

#[tokio::test]
async fn report_upload_is_sent_as_multipart() {
    let server = MockServer::start().await;
    let client = signed_in(&server).await;

    let analysis = client.upload_test_report(PATIENT_ID, pdf(2048)).await.unwrap();
    assert_eq!(analysis.report_id.as_deref(), Some("rep-PAT-0042"));
    let flagged: Vec<_> = analysis.flagged_tests().map(|t| t.name.as_str()).collect();
    assert_eq!(flagged, vec!["WBC"]);
    assert_eq!(analysis.tests[0].severity, Severity::Low);

    let content_types = server.backend.upload_content_types.lock().clone();
    assert_eq!(content_types.len(), 1);
    assert!(
        content_types[0].starts_with("multipart/form-data; boundary="),
        "got {}",
        content_types[0]
    );
}

#[tokio::test]
async fn upload_at_size_limit_is_accepted() {
    let server = MockServer::start().await;
    let client = signed_in(&server).await;

    let analysis = client
        .upload_test_report(PATIENT_ID, pdf(MAX_UPLOAD_BYTES as usize))
        .await
        .unwrap();
    assert!(analysis.summary.is_some());
    assert_eq!(Counters::get(&server.counters().upload), 1);
}

#[tokio::test]
async fn upload_over_size_limit_never_reaches_backend() {
    let server = MockServer::start().await;
    let client = signed_in(&server).await;

    let err = client
        .upload_test_report(PATIENT_ID, pdf(MAX_UPLOAD_BYTES as usize + 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::FileTooLarge { .. })
    ));
    assert_eq!(Counters::get(&server.counters().upload), 0);
}

#[tokio::test]
async fn unsupported_file_type_is_rejected_locally() {
    let server = MockServer::start().await;
    let client = signed_in(&server).await;
    let gif = FileUpload::new("scan.gif", "image/gif", vec![1, 2, 3]);

    let err = client.upload_prescription(PATIENT_ID, gif).await.unwrap_err();
    match err {
        ApiError::Validation(ValidationError::UnsupportedFileType { mime }) => {
            assert_eq!(mime, "image/gif")
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(Counters::get(&server.counters().upload), 0);
}

#[tokio::test]
async fn validation_runs_before_credential_check() {
    let server = MockServer::start().await;
    let (client, _store) = server.client();

    let err = client
        .upload_test_report(PATIENT_ID, FileUpload::new("x.png", "image/png", Vec::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(ValidationError::EmptyFile)));
}

#[tokio::test]
async fn upload_is_replayed_after_refresh() {
    let server = MockServer::start().await;
    let client = signed_in(&server).await;
    server.backend.expire_access_token();

    let analysis = client
        .upload_prescription(PATIENT_ID, FileUpload::new("rx.jpg", "image/jpeg", vec![7; 512]))
        .await
        .unwrap();
    assert_eq!(analysis.prescription_id.as_deref(), Some("rx-PAT-0042"));
    assert_eq!(analysis.medications[0].name, "Amoxicillin");
    assert!(!analysis.interaction_check.has_interactions);
    assert_eq!(Counters::get(&server.counters().upload), 2);
    assert_eq!(Counters::get(&server.counters().refresh), 1);
}

#[tokio::test]
async fn empty_doctor_input_is_rejected() {
    let server = MockServer::start().await;
    let client = signed_in(&server).await;

    let err = client
        .generate_visit_note(
            PATIENT_ID,
            &VisitNoteRequest {
                doctor_input: "   ".into(),
                patient_context: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::MissingField("doctor input"))
    ));
    assert_eq!(Counters::get(&server.counters().resource), 0);
}

//! In-process mock of the clinical backend
//!
//! Serves the auth and clinical routes under `/api` on an ephemeral port and
//! counts every call so tests can assert exactly how much network traffic a
//! client operation produced.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use carelink_client::{ApiClient, CredentialStore, MemoryCredentialStore, build_client_with_store};
use carelink_config::{ApiConfig, ClientConfig, StorageBackend};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

pub const PASSWORD: &str = "correct-horse";
pub const DOCTOR_EMAIL: &str = "dr.okafor@ward7.example";
pub const PATIENT_ID: &str = "PAT-0042";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Issue a new access and refresh token
    Rotate,
    /// Issue a new access token only
    Reuse,
    /// Reject with the given status
    Fail(u16),
}

#[derive(Debug, Default)]
pub struct Counters {
    pub login: AtomicUsize,
    pub logout: AtomicUsize,
    pub me: AtomicUsize,
    pub refresh: AtomicUsize,
    pub resource: AtomicUsize,
    pub upload: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct Tokens {
    generation: usize,
    access: String,
    refresh: String,
}

#[derive(Debug)]
pub struct Backend {
    pub counters: Counters,
    tokens: Mutex<Tokens>,
    refresh_mode: Mutex<RefreshMode>,
    refresh_delay: Mutex<Duration>,
    /// Every protected route answers 401, even to fresh tokens
    reject_all: Mutex<bool>,
    pub received_refresh_tokens: Mutex<Vec<String>>,
    pub upload_content_types: Mutex<Vec<String>>,
}

impl Backend {
    fn new() -> Self {
        Self {
            counters: Counters::default(),
            tokens: Mutex::new(Tokens {
                generation: 0,
                access: "access-0".into(),
                refresh: "refresh-0".into(),
            }),
            refresh_mode: Mutex::new(RefreshMode::Reuse),
            refresh_delay: Mutex::new(Duration::ZERO),
            reject_all: Mutex::new(false),
            received_refresh_tokens: Mutex::new(Vec::new()),
            upload_content_types: Mutex::new(Vec::new()),
        }
    }

    /// Invalidate the current access token; the refresh token stays valid.
    pub fn expire_access_token(&self) {
        self.tokens.lock().access = "expired".into();
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *self.refresh_mode.lock() = mode;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock() = delay;
    }

    pub fn reject_all(&self) {
        *self.reject_all.lock() = true;
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        if *self.reject_all.lock() {
            return false;
        }
        let expected = format!("Bearer {}", self.tokens.lock().access);
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub backend: Arc<Backend>,
}

impl MockServer {
    pub async fn start() -> Self {
        let backend = Arc::new(Backend::new());
        let api = Router::new()
            .route("/health", get(health))
            .route("/auth/login", post(login))
            .route("/auth/patient/login", post(patient_login))
            .route("/auth/logout", post(logout))
            .route("/auth/me", get(me))
            .route("/auth/refresh", post(refresh))
            .route("/symptoms/analyze", post(analyze_symptoms))
            .route("/patients/{id}/test-reports/upload", post(upload_report))
            .route("/patients/{id}/prescriptions/upload", post(upload_prescription))
            .route("/patients/{id}/visit-notes/generate", post(slow_visit_note))
            .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
            .with_state(backend.clone());
        let app = Router::new().nest("/api", api);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, backend }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr)).unwrap()
    }

    pub fn config(&self) -> ClientConfig {
        config_for(self.base_url())
    }

    /// Client over a fresh in-memory store, plus a handle to that store.
    pub fn client(&self) -> (ApiClient, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let client = self.client_with_store(store.clone());
        (client, store)
    }

    pub fn client_with_store(&self, store: Arc<dyn CredentialStore>) -> ApiClient {
        build_client_with_store(&self.config(), store).unwrap()
    }

    pub fn counters(&self) -> &Counters {
        &self.backend.counters
    }
}

pub fn config_for(base_url: Url) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api = ApiConfig::with_base_url(base_url);
    config.storage.backend = StorageBackend::Memory;
    config
}

/// Base URL of a port nothing listens on.
pub async fn closed_port_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/api")).unwrap()
}

pub fn doctor_json() -> Value {
    json!({
        "_id": "u-doc-1",
        "name": "Dr. Ada Okafor",
        "role": "doctor",
        "lastLogin": "2026-10-01T08:30:00Z"
    })
}

fn patient_json() -> Value {
    json!({
        "_id": "u-pat-42",
        "name": "Sam Rivera",
        "role": "patient",
        "patientId": PATIENT_ID
    })
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Token expired" })),
    )
        .into_response()
}

async fn health() -> StatusCode {
    StatusCode::OK
}

fn issue_session(backend: &Backend, user: Value) -> Response {
    let tokens = backend.tokens.lock();
    Json(json!({
        "success": true,
        "user": user,
        "accessToken": tokens.access,
        "refreshToken": tokens.refresh,
    }))
    .into_response()
}

async fn login(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    backend.counters.login.fetch_add(1, Ordering::SeqCst);
    match (body["email"].as_str(), body["password"].as_str()) {
        (Some("silent@ward7.example"), _) => StatusCode::UNAUTHORIZED.into_response(),
        (Some(DOCTOR_EMAIL), Some(PASSWORD)) => issue_session(&backend, doctor_json()),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid email or password" })),
        )
            .into_response(),
    }
}

async fn patient_login(
    State(backend): State<Arc<Backend>>,
    Json(body): Json<Value>,
) -> Response {
    backend.counters.login.fetch_add(1, Ordering::SeqCst);
    match (body["patientId"].as_str(), body["password"].as_str()) {
        (Some(PATIENT_ID), Some(PASSWORD)) => issue_session(&backend, patient_json()),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unknown patient" })),
        )
            .into_response(),
    }
}

async fn logout(State(backend): State<Arc<Backend>>) -> StatusCode {
    backend.counters.logout.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

async fn me(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    backend.counters.me.fetch_add(1, Ordering::SeqCst);
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "user": doctor_json() })).into_response()
}

async fn refresh(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    backend.counters.refresh.fetch_add(1, Ordering::SeqCst);
    let presented = body["refreshToken"].as_str().unwrap_or_default().to_string();
    backend.received_refresh_tokens.lock().push(presented.clone());

    let delay = *backend.refresh_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mode = *backend.refresh_mode.lock();
    if let RefreshMode::Fail(status) = mode {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, Json(json!({ "error": "Refresh rejected" }))).into_response();
    }

    let mut tokens = backend.tokens.lock();
    if presented != tokens.refresh {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unknown refresh token" })),
        )
            .into_response();
    }

    tokens.generation += 1;
    tokens.access = format!("access-{}", tokens.generation);
    match mode {
        RefreshMode::Rotate => {
            tokens.refresh = format!("refresh-{}", tokens.generation);
            Json(json!({
                "accessToken": tokens.access,
                "refreshToken": tokens.refresh,
            }))
            .into_response()
        }
        _ => Json(json!({ "accessToken": tokens.access })).into_response(),
    }
}

async fn analyze_symptoms(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend.counters.resource.fetch_add(1, Ordering::SeqCst);
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    if body["symptomDescription"] == "trigger server error" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Analysis service unavailable" })),
        )
            .into_response();
    }
    Json(json!({
        "data": {
            "possibleConditions": ["Viral upper respiratory infection"],
            "recommendedTests": ["CBC"],
            "urgency": "low",
            "summary": format!("Echo: {}", body["symptomDescription"].as_str().unwrap_or_default()),
        }
    }))
    .into_response()
}

fn record_upload(backend: &Backend, headers: &HeaderMap) {
    backend.counters.upload.fetch_add(1, Ordering::SeqCst);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    backend.upload_content_types.lock().push(content_type);
}

async fn upload_report(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record_upload(&backend, &headers);
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "reportId": format!("rep-{id}"),
        "tests": [
            { "testName": "Hemoglobin", "value": 9.1, "unit": "g/dL", "status": "low" },
            { "testName": "WBC", "value": 14.2, "unit": "10^9/L", "status": "high" }
        ],
        "aiSummary": format!("{} bytes analysed", body.len()),
    }))
    .into_response()
}

async fn upload_prescription(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    _body: Bytes,
) -> Response {
    record_upload(&backend, &headers);
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "data": {
            "prescriptionId": format!("rx-{id}"),
            "medications": [{ "name": "Amoxicillin", "dosage": "500mg" }],
            "drugInteractions": { "hasInteractions": false, "interactions": [] }
        }
    }))
    .into_response()
}

async fn slow_visit_note(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
) -> Response {
    backend.counters.resource.fetch_add(1, Ordering::SeqCst);
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "assessment": "late" })).into_response()
}

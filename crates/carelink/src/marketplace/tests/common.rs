use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::domain::{RequirementStatus, VerificationRequirement};
use crate::integrations::blob::LocalBlobStore;
use crate::integrations::jobs::{Job, JobError, JobId, JobQueue};
use crate::marketplace::{
    marketplace_router, ClientRegistration, DocumentUpload, InMemoryMarketplace, LoginRequest,
    MarketplaceRepository, MarketplaceService, ReviewDecision, Session, SessionStore,
    WorkerRegistration,
};

pub(super) const PUBLIC_BASE: &str = "http://files.carelink.test/uploads";
pub(super) const ADMIN_EMAIL: &str = "ops@carelink.test";
pub(super) const ADMIN_PASSWORD: &str = "correct horse battery";
pub(super) const WORKER_PASSWORD: &str = "worker-password";
pub(super) const BOUNDARY: &str = "carelink-test-boundary";

#[derive(Default)]
pub(super) struct RecordingQueue {
    declines: bool,
    jobs: Mutex<Vec<Job>>,
}

impl RecordingQueue {
    pub(super) fn declining() -> Self {
        Self {
            declines: true,
            ..Self::default()
        }
    }

    pub(super) fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().expect("queue poisoned").clone()
    }
}

impl JobQueue for RecordingQueue {
    fn send(&self, job: Job) -> Result<Option<JobId>, JobError> {
        if self.declines {
            return Ok(None);
        }
        self.jobs.lock().expect("queue poisoned").push(job);
        Ok(Some(JobId::new()))
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<MarketplaceService>,
    pub(super) repository: Arc<InMemoryMarketplace>,
    pub(super) blobs: Arc<LocalBlobStore>,
    pub(super) jobs: Arc<RecordingQueue>,
    _uploads: TempDir,
}

impl Harness {
    pub(super) fn router(&self) -> Router {
        marketplace_router(self.service.clone())
    }

    pub(super) fn rows(&self, session: &Session) -> Vec<VerificationRequirement> {
        let worker = self.service.worker_profile(session).expect("worker profile");
        self.repository.requirements(worker.id).expect("requirements")
    }

    pub(super) fn row(&self, session: &Session, requirement_type: &str) -> VerificationRequirement {
        self.rows(session)
            .into_iter()
            .find(|row| row.requirement_type.as_str() == requirement_type)
            .unwrap_or_else(|| panic!("no {requirement_type} row"))
    }
}

pub(super) fn harness() -> Harness {
    harness_with_queue(RecordingQueue::default())
}

pub(super) fn harness_with_queue(queue: RecordingQueue) -> Harness {
    let uploads = TempDir::new().expect("temp upload dir");
    let repository = Arc::new(InMemoryMarketplace::new());
    let blobs = Arc::new(LocalBlobStore::new(uploads.path(), PUBLIC_BASE).expect("blob store"));
    let jobs = Arc::new(queue);
    let service = Arc::new(MarketplaceService::new(
        repository.clone(),
        blobs.clone(),
        jobs.clone(),
        SessionStore::new(Duration::from_secs(600)),
    ));
    Harness {
        service,
        repository,
        blobs,
        jobs,
        _uploads: uploads,
    }
}

pub(super) fn worker_registration(email: &str, services: &[&str]) -> WorkerRegistration {
    WorkerRegistration {
        email: email.to_string(),
        password: WORKER_PASSWORD.to_string(),
        first_name: "Mei".to_string(),
        last_name: "Tanaka".to_string(),
        phone: Some("0400 111 222".to_string()),
        suburb: Some("Fitzroy".to_string()),
        bio: None,
        services: services.iter().map(|code| code.to_string()).collect(),
    }
}

pub(super) fn client_registration(email: &str) -> ClientRegistration {
    ClientRegistration {
        email: email.to_string(),
        password: "client-password".to_string(),
        first_name: "Sam".to_string(),
        last_name: "Okafor".to_string(),
        phone: None,
        relationship: None,
        participant: None,
    }
}

/// Registers a nursing worker and returns their session.
pub(super) fn nursing_worker(harness: &Harness) -> Session {
    harness
        .service
        .register_worker(worker_registration("mei@example.test", &["nursing"]))
        .expect("worker registers")
        .session
}

pub(super) fn admin_session(harness: &Harness) -> Session {
    harness
        .service
        .bootstrap_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
        .expect("admin bootstrap");
    harness
        .service
        .login(LoginRequest {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        })
        .expect("admin signs in")
        .session
}

pub(super) fn pdf_upload(requirement_type: &str) -> DocumentUpload {
    DocumentUpload {
        requirement_type: requirement_type.to_string(),
        file_name: format!("{requirement_type}.pdf"),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.7 test document".to_vec(),
        expires_at: None,
        notes: None,
    }
}

pub(super) fn expiring_upload(requirement_type: &str, expires_at: DateTime<Utc>) -> DocumentUpload {
    DocumentUpload {
        expires_at: Some(expires_at),
        ..pdf_upload(requirement_type)
    }
}

/// Submits and approves every requirement the worker has.
pub(super) fn approve_everything(harness: &Harness, worker: &Session, admin: &Session) {
    for row in harness.rows(worker) {
        let submitted = if row.status == RequirementStatus::Submitted {
            row
        } else {
            harness
                .service
                .upload_document(worker, pdf_upload(row.requirement_type.as_str()))
                .expect("upload")
        };
        harness
            .service
            .review(admin, submitted.id, ReviewDecision::Approve)
            .expect("approve");
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("route executes");
    let status = response.status();
    (status, read_json_body(response).await)
}

pub(super) fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).expect("encode body")))
        .expect("request builds")
}

pub(super) fn bare_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request builds")
}

/// A `multipart/form-data` upload request with text fields and one file part.
pub(super) fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .expect("request builds")
}

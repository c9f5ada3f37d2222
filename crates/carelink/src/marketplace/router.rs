use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::envelope::ApiResponse;
use super::registration::{
    ClientRegistration, LoginRequest, ValidationErrors, WorkerProfileUpdate, WorkerRegistration,
};
use super::service::{
    DocumentUpload, MarketplaceError, MarketplaceService, ProgressUpdate, ReviewDecision,
};
use super::session::{bearer_token, Session};
use crate::domain::{RequirementId, Role, User};

/// Upper bound on a multipart document upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Every `/api` route of the marketplace.
pub fn marketplace_router(service: Arc<MarketplaceService>) -> Router {
    Router::new()
        .route("/api/auth/register/worker", post(register_worker_handler))
        .route("/api/auth/register/client", post(register_client_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/session", get(session_handler))
        .route(
            "/api/worker/profile",
            get(worker_profile_handler).put(update_worker_profile_handler),
        )
        .route("/api/worker/requirements", get(worker_requirements_handler))
        .route("/api/worker/setup/steps", get(setup_steps_handler))
        .route("/api/worker/setup/progress", put(setup_progress_handler))
        .route(
            "/api/worker/documents",
            post(upload_document_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        )
        .route(
            "/api/worker/documents/:requirement_id",
            delete(remove_document_handler),
        )
        .route("/api/client/profile", get(client_profile_handler))
        .route(
            "/api/admin/workers/:worker_id/documents",
            get(categorized_documents_handler),
        )
        .route(
            "/api/admin/workers/:worker_id/publish",
            post(publish_handler),
        )
        .route(
            "/api/admin/workers/:worker_id/unpublish",
            post(unpublish_handler),
        )
        .route("/api/admin/workers/:worker_id/audit", get(audit_handler))
        .route(
            "/api/admin/requirements/:requirement_id/approve",
            post(approve_handler),
        )
        .route(
            "/api/admin/requirements/:requirement_id/reject",
            post(reject_handler),
        )
        .route(
            "/api/admin/requirements/:requirement_id/reset",
            post(reset_handler),
        )
        .with_state(service)
}

type Service = State<Arc<MarketplaceService>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RejectRequest {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct SessionView {
    session: Session,
    user: User,
}

pub(crate) async fn register_worker_handler(
    State(service): Service,
    payload: Result<Json<WorkerRegistration>, JsonRejection>,
) -> Response {
    let result = json_body(payload).and_then(|registration| service.register_worker(registration));
    reply(StatusCode::CREATED, result)
}

pub(crate) async fn register_client_handler(
    State(service): Service,
    payload: Result<Json<ClientRegistration>, JsonRejection>,
) -> Response {
    let result = json_body(payload).and_then(|registration| service.register_client(registration));
    reply(StatusCode::CREATED, result)
}

pub(crate) async fn login_handler(
    State(service): Service,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    reply(StatusCode::OK, json_body(payload).and_then(|login| service.login(login)))
}

pub(crate) async fn logout_handler(State(service): Service, headers: HeaderMap) -> Response {
    let result = service
        .authenticate(bearer_token(&headers))
        .map(|session| service.logout(&session.token));
    reply(StatusCode::OK, result.map(|revoked| serde_json::json!({ "revoked": revoked })))
}

pub(crate) async fn session_handler(State(service): Service, headers: HeaderMap) -> Response {
    let result = service
        .authenticate(bearer_token(&headers))
        .and_then(|session| {
            let user = service.current_user(&session)?;
            Ok(SessionView { session, user })
        });
    reply(StatusCode::OK, result)
}

pub(crate) async fn worker_profile_handler(State(service): Service, headers: HeaderMap) -> Response {
    let result = service
        .authorize(bearer_token(&headers), Role::Worker)
        .and_then(|session| service.worker_profile(&session));
    reply(StatusCode::OK, result)
}

pub(crate) async fn update_worker_profile_handler(
    State(service): Service,
    headers: HeaderMap,
    payload: Result<Json<WorkerProfileUpdate>, JsonRejection>,
) -> Response {
    let result = service
        .authorize(bearer_token(&headers), Role::Worker)
        .and_then(|session| {
            let update = json_body(payload)?;
            service.update_worker_profile(&session, update)
        });
    reply(StatusCode::OK, result)
}

pub(crate) async fn worker_requirements_handler(
    State(service): Service,
    headers: HeaderMap,
) -> Response {
    let result = service
        .authorize(bearer_token(&headers), Role::Worker)
        .and_then(|session| service.worker_requirements(&session));
    reply(StatusCode::OK, result)
}

pub(crate) async fn setup_steps_handler(State(service): Service, headers: HeaderMap) -> Response {
    let result = service
        .authorize(bearer_token(&headers), Role::Worker)
        .and_then(|session| service.setup_steps(&session));
    reply(StatusCode::OK, result)
}

pub(crate) async fn setup_progress_handler(
    State(service): Service,
    headers: HeaderMap,
    payload: Result<Json<ProgressUpdate>, JsonRejection>,
) -> Response {
    let result = service
        .authorize(bearer_token(&headers), Role::Worker)
        .and_then(|session| {
            let update = json_body(payload)?;
            service.update_setup_progress(&session, update)
        });
    reply(StatusCode::OK, result)
}

pub(crate) async fn upload_document_handler(
    State(service): Service,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let session = match service.authorize(bearer_token(&headers), Role::Worker) {
        Ok(session) => session,
        Err(err) => return error_response(err),
    };
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return error_response(invalid("file", rejection.body_text())),
    };
    let result = match read_upload(multipart).await {
        Ok(upload) => {
            let service = service.clone();
            run_blocking(move || service.upload_document(&session, upload)).await
        }
        Err(err) => Err(err),
    };
    reply(StatusCode::CREATED, result)
}

pub(crate) async fn remove_document_handler(
    State(service): Service,
    headers: HeaderMap,
    Path(requirement_id): Path<String>,
) -> Response {
    let authorized = service
        .authorize(bearer_token(&headers), Role::Worker)
        .and_then(|session| {
            let id = parse_id::<RequirementId>(&requirement_id, "requirement")?;
            Ok((session, id))
        });
    let result = match authorized {
        Ok((session, id)) => {
            let service = service.clone();
            run_blocking(move || {
                service.remove_document(&session, id)?;
                Ok(serde_json::json!({ "requirementId": id }))
            })
            .await
        }
        Err(err) => Err(err),
    };
    reply(StatusCode::OK, result)
}

/// Runs a service call that touches blob storage on the blocking thread pool.
async fn run_blocking<T, F>(task: F) -> Result<T, MarketplaceError>
where
    F: FnOnce() -> Result<T, MarketplaceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .unwrap_or_else(|err| Err(MarketplaceError::TaskFailed(err.to_string())))
}

pub(crate) async fn client_profile_handler(State(service): Service, headers: HeaderMap) -> Response {
    let result = service
        .authorize(bearer_token(&headers), Role::Client)
        .and_then(|session| service.client_profile(&session));
    reply(StatusCode::OK, result)
}

pub(crate) async fn categorized_documents_handler(
    State(service): Service,
    headers: HeaderMap,
    Path(worker_id): Path<String>,
) -> Response {
    let result = service
        .authorize(bearer_token(&headers), Role::Admin)
        .and_then(|_| service.categorized_documents(parse_id(&worker_id, "worker")?));
    reply(StatusCode::OK, result)
}

pub(crate) async fn publish_handler(
    State(service): Service,
    headers: HeaderMap,
    Path(worker_id): Path<String>,
) -> Response {
    set_published(&service, &headers, &worker_id, true)
}

pub(crate) async fn unpublish_handler(
    State(service): Service,
    headers: HeaderMap,
    Path(worker_id): Path<String>,
) -> Response {
    set_published(&service, &headers, &worker_id, false)
}

fn set_published(
    service: &MarketplaceService,
    headers: &HeaderMap,
    worker_id: &str,
    publish: bool,
) -> Response {
    let result = service
        .authorize(bearer_token(headers), Role::Admin)
        .and_then(|admin| service.set_published(&admin, parse_id(worker_id, "worker")?, publish));
    reply(StatusCode::OK, result)
}

pub(crate) async fn audit_handler(
    State(service): Service,
    headers: HeaderMap,
    Path(worker_id): Path<String>,
) -> Response {
    let result = service
        .authorize(bearer_token(&headers), Role::Admin)
        .and_then(|_| service.audit_trail(parse_id(&worker_id, "worker")?));
    reply(StatusCode::OK, result)
}

pub(crate) async fn approve_handler(
    State(service): Service,
    headers: HeaderMap,
    Path(requirement_id): Path<String>,
) -> Response {
    review(&service, &headers, &requirement_id, ReviewDecision::Approve)
}

pub(crate) async fn reject_handler(
    State(service): Service,
    headers: HeaderMap,
    Path(requirement_id): Path<String>,
    payload: Option<Json<RejectRequest>>,
) -> Response {
    let reason = payload
        .and_then(|Json(request)| request.reason)
        .unwrap_or_default();
    review(&service, &headers, &requirement_id, ReviewDecision::Reject { reason })
}

pub(crate) async fn reset_handler(
    State(service): Service,
    headers: HeaderMap,
    Path(requirement_id): Path<String>,
) -> Response {
    review(&service, &headers, &requirement_id, ReviewDecision::Reset)
}

fn review(
    service: &MarketplaceService,
    headers: &HeaderMap,
    requirement_id: &str,
    decision: ReviewDecision,
) -> Response {
    let result = service
        .authorize(bearer_token(headers), Role::Admin)
        .and_then(|admin| {
            let id = parse_id(requirement_id, "requirement")?;
            service.review(&admin, id, decision)
        });
    reply(StatusCode::OK, result)
}

/// Collects the multipart fields of a document upload.
pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<DocumentUpload, MarketplaceError> {
    let mut requirement_type = None;
    let mut file = None;
    let mut expires_at = None;
    let mut notes = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(invalid("file", err.body_text())),
        };
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "requirement_type" | "requirementType" => {
                requirement_type = Some(field.text().await.map_err(|err| invalid(&name, err.body_text()))?);
            }
            "expires_at" | "expiresAt" => {
                let raw = field.text().await.map_err(|err| invalid(&name, err.body_text()))?;
                expires_at = parse_expiry(&raw).map_err(|message| invalid(&name, message))?;
            }
            "notes" => {
                notes = Some(field.text().await.map_err(|err| invalid(&name, err.body_text()))?);
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("document").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref())
                    .to_string();
                if !accepted_content_type(&content_type) {
                    return Err(invalid("file", format!("unsupported file type {content_type}")));
                }
                let bytes = field.bytes().await.map_err(|err| invalid("file", err.body_text()))?;
                if bytes.len() > MAX_UPLOAD_BYTES {
                    return Err(invalid("file", "file is too large"));
                }
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let mut errors = ValidationErrors::default();
    if requirement_type.is_none() {
        errors.add("requirementType", "is required");
    }
    if file.is_none() {
        errors.add("file", "is required");
    }
    match (requirement_type, file) {
        (Some(requirement_type), Some((file_name, content_type, bytes))) => Ok(DocumentUpload {
            requirement_type,
            file_name,
            content_type,
            bytes,
            expires_at,
            notes,
        }),
        _ => Err(MarketplaceError::Validation(errors)),
    }
}

fn accepted_content_type(raw: &str) -> bool {
    let Ok(parsed) = raw.parse::<mime::Mime>() else {
        return false;
    };
    parsed.essence_str() == mime::APPLICATION_PDF.essence_str()
        || (parsed.type_() == mime::IMAGE
            && matches!(parsed.subtype().as_str(), "jpeg" | "png" | "webp" | "heic"))
}

/// RFC 3339 timestamp or a plain date, which expires at the end of that day (UTC).
fn parse_expiry(raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    let end_of_day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .ok_or_else(|| format!("'{raw}' is not a date"))?;
    Ok(Some(end_of_day.and_utc()))
}

fn invalid(field: &str, message: impl Into<String>) -> MarketplaceError {
    let mut errors = ValidationErrors::default();
    errors.add(field, message);
    MarketplaceError::Validation(errors)
}

fn parse_id<T: FromStr>(raw: &str, entity: &'static str) -> Result<T, MarketplaceError> {
    raw.parse().map_err(|_| MarketplaceError::NotFound(entity))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, MarketplaceError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| invalid("body", rejection.body_text()))
}

fn reply<T: Serialize>(status: StatusCode, result: Result<T, MarketplaceError>) -> Response {
    match result {
        Ok(data) => (status, Json(ApiResponse::ok(data))).into_response(),
        Err(err) => error_response(err),
    }
}

/// Maps a service failure onto its status code and the failure envelope.
pub fn error_response(err: MarketplaceError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "marketplace request failed");
    }
    let body = match &err {
        MarketplaceError::Validation(errors) => {
            ApiResponse::<()>::failure("validation failed").with_fields(errors.as_map().clone())
        }
        other => ApiResponse::failure(other.to_string()),
    };
    (status, Json(body)).into_response()
}

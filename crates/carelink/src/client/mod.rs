//! HTTP client for programmatic consumers of the marketplace API: cached queries,
//! prefix-invalidating mutations, and retried requests.

pub mod backoff;
pub mod cache;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

pub use backoff::{retry_with_backoff, BackoffPolicy, Retryable};
pub use cache::QueryCache;

use crate::domain::{
    AuditEntry, RequirementId, VerificationRequirement, WorkerId, WorkerProfile,
};
use crate::marketplace::{
    ApiResponse, ClientRegistration, DocumentUpload, LoginRequest, ReviewDecision, Session,
    WorkerProfileUpdate, WorkerRegistration,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message} (status {status})")]
    Api {
        status: u16,
        message: String,
        fields: BTreeMap<String, String>,
    },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|status| status.as_u16()),
            ClientError::Decode(_) => None,
        }
    }
}

impl Retryable for ClientError {
    fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(err) => !err.is_builder() && !err.is_decode(),
            ClientError::Api { status, .. } => *status >= 500,
            ClientError::Decode(_) => false,
        }
    }
}

#[derive(Deserialize)]
struct Authenticated {
    session: Session,
}

/// Bearer-authenticated client for the `/api` routes.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    cache: QueryCache,
    backoff: BackoffPolicy,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            cache: QueryCache::new(DEFAULT_STALE_TIME),
            backoff: BackoffPolicy::default(),
        })
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.cache = QueryCache::new(stale_time);
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Switches identity; cached responses belonged to the previous one.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
        self.cache.clear();
    }

    pub async fn register_worker(
        &mut self,
        registration: &WorkerRegistration,
    ) -> Result<Session, ClientError> {
        let signed_in: Authenticated = self
            .mutate(Method::POST, "/api/auth/register/worker", Some(json_value(registration)?), &[])
            .await?;
        self.set_token(Some(signed_in.session.token.clone()));
        Ok(signed_in.session)
    }

    pub async fn register_client(
        &mut self,
        registration: &ClientRegistration,
    ) -> Result<Session, ClientError> {
        let signed_in: Authenticated = self
            .mutate(Method::POST, "/api/auth/register/client", Some(json_value(registration)?), &[])
            .await?;
        self.set_token(Some(signed_in.session.token.clone()));
        Ok(signed_in.session)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, ClientError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let signed_in: Authenticated = self
            .mutate(Method::POST, "/api/auth/login", Some(json_value(&request)?), &[])
            .await?;
        self.set_token(Some(signed_in.session.token.clone()));
        Ok(signed_in.session)
    }

    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let _: Value = self.mutate(Method::POST, "/api/auth/logout", None, &[]).await?;
        self.set_token(None);
        Ok(())
    }

    pub async fn worker_profile(&self) -> Result<WorkerProfile, ClientError> {
        self.query("/api/worker/profile").await
    }

    pub async fn update_worker_profile(
        &self,
        update: &WorkerProfileUpdate,
    ) -> Result<WorkerProfile, ClientError> {
        self.mutate(Method::PUT, "/api/worker/profile", Some(json_value(update)?), &["/api/worker/"])
            .await
    }

    pub async fn worker_requirements(&self) -> Result<Value, ClientError> {
        self.query("/api/worker/requirements").await
    }

    pub async fn setup_steps(&self) -> Result<Value, ClientError> {
        self.query("/api/worker/setup/steps").await
    }

    pub async fn update_setup_progress(&self, slug: &str, completed: bool) -> Result<Value, ClientError> {
        let body = json!({ "slug": slug, "completed": completed });
        self.mutate(Method::PUT, "/api/worker/setup/progress", Some(body), &["/api/worker/setup/"])
            .await
    }

    pub async fn upload_document(
        &self,
        upload: &DocumentUpload,
    ) -> Result<VerificationRequirement, ClientError> {
        let url = self.url("/api/worker/documents");
        let value = self
            .execute(|http| {
                let mut form = Form::new().text("requirementType", upload.requirement_type.clone());
                if let Some(expires_at) = upload.expires_at {
                    form = form.text("expiresAt", expires_at.to_rfc3339());
                }
                if let Some(notes) = &upload.notes {
                    form = form.text("notes", notes.clone());
                }
                let file = Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
                let file = match file.mime_str(&upload.content_type) {
                    Ok(file) => file,
                    Err(_) => Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone()),
                };
                http.post(url.as_str()).multipart(form.part("file", file))
            })
            .await?;
        self.cache.invalidate_prefix("/api/worker/");
        decode_value(value)
    }

    pub async fn remove_document(&self, requirement_id: RequirementId) -> Result<(), ClientError> {
        let path = format!("/api/worker/documents/{requirement_id}");
        let _: Value = self.mutate(Method::DELETE, &path, None, &["/api/worker/"]).await?;
        Ok(())
    }

    pub async fn client_profile(&self) -> Result<Value, ClientError> {
        self.query("/api/client/profile").await
    }

    pub async fn worker_documents(&self, worker_id: WorkerId) -> Result<Value, ClientError> {
        self.query(&format!("/api/admin/workers/{worker_id}/documents")).await
    }

    pub async fn audit_trail(&self, worker_id: WorkerId) -> Result<Vec<AuditEntry>, ClientError> {
        self.query(&format!("/api/admin/workers/{worker_id}/audit")).await
    }

    pub async fn review(
        &self,
        requirement_id: RequirementId,
        decision: &ReviewDecision,
    ) -> Result<VerificationRequirement, ClientError> {
        let (action, body) = match decision {
            ReviewDecision::Approve => ("approve", None),
            ReviewDecision::Reject { reason } => ("reject", Some(json!({ "reason": reason }))),
            ReviewDecision::Reset => ("reset", None),
        };
        let path = format!("/api/admin/requirements/{requirement_id}/{action}");
        self.mutate(Method::POST, &path, body, &["/api/admin/workers/"]).await
    }

    pub async fn set_published(
        &self,
        worker_id: WorkerId,
        publish: bool,
    ) -> Result<WorkerProfile, ClientError> {
        let action = if publish { "publish" } else { "unpublish" };
        let scope = format!("/api/admin/workers/{worker_id}/");
        let path = format!("{scope}{action}");
        self.mutate(Method::POST, &path, None, &[scope.as_str()]).await
    }

    /// Cached GET; a fresh entry skips the network.
    pub async fn query<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        if let Some(value) = self.cache.get(path) {
            debug!(path, "query cache hit");
            return decode_value(value);
        }
        let url = self.url(path);
        let value = self.execute(|http| http.get(url.as_str())).await?;
        self.cache.insert(path, value.clone());
        decode_value(value)
    }

    /// Uncached request; on success every cached key under `invalidates` is dropped.
    pub async fn mutate<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        invalidates: &[&str],
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        let value = self
            .execute(|http| {
                let request = http.request(method.clone(), url.as_str());
                match &body {
                    Some(body) => request.json(body),
                    None => request,
                }
            })
            .await?;
        for prefix in invalidates {
            self.cache.invalidate_prefix(prefix);
        }
        decode_value(value)
    }

    async fn execute<F>(&self, build: F) -> Result<Value, ClientError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let build = &build;
        let http = &self.http;
        let token = self.token.as_deref();
        retry_with_backoff(&self.backoff, || async move {
            let mut request = build(http);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;
            unwrap_envelope(response).await
        })
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn unwrap_envelope(response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    let envelope = match response.json::<ApiResponse<Value>>().await {
        Ok(envelope) => envelope,
        Err(err) if status.is_success() => return Err(ClientError::Decode(err.to_string())),
        Err(_) => {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
                fields: BTreeMap::new(),
            })
        }
    };
    if status.is_success() && envelope.success {
        return Ok(envelope.data.unwrap_or(Value::Null));
    }
    Err(ClientError::Api {
        status: status.as_u16(),
        message: envelope.error.unwrap_or_else(|| "request failed".to_string()),
        fields: envelope.fields.unwrap_or_default(),
    })
}

fn json_value<T: Serialize>(body: &T) -> Result<Value, ClientError> {
    serde_json::to_value(body).map_err(|err| ClientError::Decode(err.to_string()))
}

fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|err| ClientError::Decode(err.to_string()))
}

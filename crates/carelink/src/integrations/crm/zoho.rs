use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::token::{AccessToken, TokenCache, TokenResponse};
use super::{CrmContact, CrmError, CrmSync};
use crate::config::CrmConfig;

const PAGE_SIZE: u32 = 200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Zoho CRM v2 client authenticated with a long-lived refresh token.
pub struct ZohoClient {
    http: reqwest::Client,
    config: CrmConfig,
    token: TokenCache,
}

impl ZohoClient {
    pub fn new(config: CrmConfig) -> Result<Self, CrmError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: CrmConfig) -> Self {
        Self {
            http,
            config,
            token: TokenCache::default(),
        }
    }

    async fn access_token(&self) -> Result<String, CrmError> {
        self.token.get_or_refresh(|| self.refresh_token()).await
    }

    async fn refresh_token(&self) -> Result<AccessToken, CrmError> {
        debug!("refreshing zoho access token");
        let response = self
            .http
            .post(format!("{}/oauth/v2/token", self.config.accounts_url))
            .query(&[
                ("refresh_token", self.config.refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CrmError::TokenRefresh(format!(
                "token endpoint responded with {}",
                response.status()
            )));
        }
        let body = response.json::<TokenResponse>().await?;
        AccessToken::from_response(body, Instant::now())
    }

    /// Sends the request with the cached token, refreshing once if Zoho answers 401.
    async fn send_authorized<F>(&self, build: F) -> Result<Response, CrmError>
    where
        F: Fn(&str) -> RequestBuilder + Send + Sync,
    {
        let token = self.access_token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("zoho rejected the cached access token; refreshing");
        self.token.invalidate().await;
        let token = self.access_token().await?;
        Ok(build(&token).send().await?)
    }

    fn authorize(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("Zoho-oauthtoken {token}"))
    }
}

#[async_trait]
impl CrmSync for ZohoClient {
    async fn upsert_contact(&self, contact: &CrmContact) -> Result<String, CrmError> {
        let url = format!("{}/crm/v2/Contacts/upsert", self.config.api_base);
        let body = UpsertRequest {
            data: [contact],
            duplicate_check_fields: ["Email"],
        };
        let response = self
            .send_authorized(|token| self.authorize(self.http.post(&url), token).json(&body))
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let payload = response.json::<UpsertResponse>().await?;
        parse_upsert(payload)
    }

    async fn search_contacts(&self, field: &str, value: &str) -> Result<Vec<CrmContact>, CrmError> {
        let url = format!("{}/crm/v2/Contacts/search", self.config.api_base);
        let criteria = search_criteria(field, value);
        let mut contacts = Vec::new();
        let mut page = 1u32;

        loop {
            let params = [
                ("criteria", criteria.clone()),
                ("page", page.to_string()),
                ("per_page", PAGE_SIZE.to_string()),
            ];
            let response = self
                .send_authorized(|token| self.authorize(self.http.get(&url), token).query(&params))
                .await?;
            if response.status() == StatusCode::NO_CONTENT {
                break;
            }
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }

            let result = response.json::<SearchPage>().await?;
            contacts.extend(result.data);
            if !result.info.is_some_and(|info| info.more_records) {
                break;
            }
            page += 1;
        }

        debug!(field, matches = contacts.len(), "zoho contact search finished");
        Ok(contacts)
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    data: [&'a CrmContact; 1],
    duplicate_check_fields: [&'static str; 1],
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<CrmContact>,
    #[serde(default)]
    info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(default)]
    more_records: bool,
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    #[serde(default)]
    data: Vec<UpsertResult>,
}

#[derive(Debug, Deserialize)]
struct UpsertResult {
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: serde_json::Value,
}

fn parse_upsert(payload: UpsertResponse) -> Result<String, CrmError> {
    let result = payload
        .data
        .into_iter()
        .next()
        .ok_or_else(|| CrmError::Decode("upsert response carried no records".into()))?;
    if result.code != "SUCCESS" {
        return Err(CrmError::Rejected {
            code: result.code,
            message: result.message,
        });
    }
    result
        .details
        .get("id")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CrmError::Decode("upsert result carried no record id".into()))
}

/// `(field:equals:value)` with Zoho's reserved characters escaped in the value.
fn search_criteria(field: &str, value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '(' | ')' | ',' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    format!("({field}:equals:{escaped})")
}

async fn api_error(response: Response) -> CrmError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    CrmError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::HeaderMap;
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeZoho {
        refreshes: AtomicUsize,
        reject_next: AtomicBool,
        seen_tokens: Mutex<Vec<String>>,
        upserts: Mutex<Vec<serde_json::Value>>,
    }

    async fn token(
        State(fake): State<Arc<FakeZoho>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        assert_eq!(params.get("grant_type").map(String::as_str), Some("refresh_token"));
        assert_eq!(params.get("refresh_token").map(String::as_str), Some("refresh"));
        let n = fake.refreshes.fetch_add(1, Ordering::SeqCst);
        Json(json!({ "access_token": format!("token-{n}"), "expires_in": 3600 }))
    }

    fn record_token(fake: &FakeZoho, headers: &HeaderMap) {
        let value = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        fake.seen_tokens.lock().expect("fake poisoned").push(value);
    }

    async fn upsert(
        State(fake): State<Arc<FakeZoho>>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> AxumResponse {
        record_token(&fake, &headers);
        if fake.reject_next.swap(false, Ordering::SeqCst) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        fake.upserts.lock().expect("fake poisoned").push(body);
        Json(json!({
            "data": [{ "code": "SUCCESS", "message": "record added", "details": { "id": "5001" } }]
        }))
        .into_response()
    }

    async fn search(
        State(fake): State<Arc<FakeZoho>>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> AxumResponse {
        record_token(&fake, &headers);
        let criteria = params.get("criteria").cloned().unwrap_or_default();
        if criteria.contains("nobody") {
            return StatusCode::NO_CONTENT.into_response();
        }
        let page = params.get("page").cloned().unwrap_or_default();
        let (id, more) = if page == "1" { ("1", true) } else { ("2", false) };
        Json(json!({
            "data": [{ "id": id, "Email": format!("{id}@example.test") }],
            "info": { "page": page, "more_records": more }
        }))
        .into_response()
    }

    async fn client_against_fake() -> (ZohoClient, Arc<FakeZoho>) {
        let fake = Arc::new(FakeZoho::default());
        let app = Router::new()
            .route("/oauth/v2/token", post(token))
            .route("/crm/v2/Contacts/upsert", post(upsert))
            .route("/crm/v2/Contacts/search", get(search))
            .with_state(fake.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake zoho");
        let base = format!("http://{}", listener.local_addr().expect("local addr"));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake zoho serves");
        });

        let config = CrmConfig {
            accounts_url: base.clone(),
            api_base: base,
            client_id: "client".into(),
            client_secret: "secret".into(),
            refresh_token: "refresh".into(),
        };
        (ZohoClient::new(config).expect("client builds"), fake)
    }

    fn contact(email: &str) -> CrmContact {
        CrmContact {
            first_name: Some("Ada".into()),
            last_name: Some("Nguyen".into()),
            email: Some(email.into()),
            contact_type: Some("Worker".into()),
            ..CrmContact::default()
        }
    }

    #[tokio::test]
    async fn upsert_reuses_the_cached_token() {
        let (client, fake) = client_against_fake().await;

        let first = client.upsert_contact(&contact("ada@example.test")).await.expect("upsert");
        let second = client.upsert_contact(&contact("ada@example.test")).await.expect("upsert");
        assert_eq!(first, "5001");
        assert_eq!(second, "5001");
        assert_eq!(fake.refreshes.load(Ordering::SeqCst), 1);

        let upserts = fake.upserts.lock().expect("fake poisoned").clone();
        assert_eq!(upserts[0]["duplicate_check_fields"], json!(["Email"]));
        assert_eq!(upserts[0]["data"][0]["Email"], "ada@example.test");
        assert!(fake
            .seen_tokens
            .lock()
            .expect("fake poisoned")
            .iter()
            .all(|header| header == "Zoho-oauthtoken token-0"));
    }

    #[tokio::test]
    async fn unauthorized_responses_force_one_refresh() {
        let (client, fake) = client_against_fake().await;
        client.upsert_contact(&contact("a@example.test")).await.expect("warm up");

        fake.reject_next.store(true, Ordering::SeqCst);
        client.upsert_contact(&contact("a@example.test")).await.expect("retried upsert");

        assert_eq!(fake.refreshes.load(Ordering::SeqCst), 2);
        let seen = fake.seen_tokens.lock().expect("fake poisoned").clone();
        assert_eq!(seen.last().map(String::as_str), Some("Zoho-oauthtoken token-1"));
    }

    #[tokio::test]
    async fn search_follows_pages_and_treats_no_content_as_empty() {
        let (client, _fake) = client_against_fake().await;

        let found = client
            .search_contacts("Platform_User_Id", "user-1")
            .await
            .expect("search succeeds");
        let ids: Vec<_> = found.iter().filter_map(|c| c.id.as_deref()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let none = client
            .search_contacts("Email", "nobody@example.test")
            .await
            .expect("empty search succeeds");
        assert!(none.is_empty());
    }

    #[test]
    fn criteria_escape_reserved_characters() {
        assert_eq!(
            search_criteria("Last_Name", "Smith (Jr), Esq"),
            "(Last_Name:equals:Smith \\(Jr\\)\\, Esq)"
        );
    }

    #[test]
    fn non_success_upserts_are_rejections() {
        let payload = UpsertResponse {
            data: vec![UpsertResult {
                code: "INVALID_DATA".into(),
                message: "invalid email".into(),
                details: json!({}),
            }],
        };
        assert!(matches!(
            parse_upsert(payload),
            Err(CrmError::Rejected { code, .. }) if code == "INVALID_DATA"
        ));
    }
}

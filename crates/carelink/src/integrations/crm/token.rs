use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::CrmError;

/// Tokens are treated as stale this long before Zoho says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// Body of `POST /oauth/v2/token`. Zoho reports failures with a 200 and an `error` field.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct AccessToken {
    value: String,
    refresh_after: Instant,
}

impl AccessToken {
    pub fn from_response(response: TokenResponse, now: Instant) -> Result<Self, CrmError> {
        if let Some(error) = response.error {
            return Err(CrmError::TokenRefresh(error));
        }
        let value = response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| CrmError::TokenRefresh("response carried no access_token".into()))?;
        let lifetime = response
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LIFETIME);

        Ok(Self {
            value,
            refresh_after: now + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.refresh_after
    }
}

/// Single-slot cache; concurrent callers wait on the same refresh.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    slot: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, CrmError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, CrmError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref().filter(|token| token.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        let token = refresh().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }
}

use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Role, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
}

/// Opaque bearer tokens held in memory until their time-to-live lapses.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, Session>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder().time_to_live(ttl).build(),
        }
    }

    pub fn open(&self, user_id: UserId, role: Role) -> Session {
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            user_id,
            role,
            issued_at: Utc::now(),
        };
        self.sessions.insert(session.token.clone(), session.clone());
        session
    }

    pub fn resolve(&self, token: &str) -> Option<Session> {
        self.sessions.get(token)
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ClientId, ParticipantId, Role, UserId, WorkerId};
use crate::marketplace::password::PasswordDigest;

/// Registered account. The password digest is never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password: PasswordDigest,
    pub created_at: DateTime<Utc>,
}

/// Step slug to completion flag, persisted as JSON on the worker profile.
pub type SetupProgress = BTreeMap<String, bool>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerProfile {
    pub id: WorkerId,
    pub user_id: UserId,
    pub phone: Option<String>,
    pub suburb: Option<String>,
    pub bio: Option<String>,
    /// Service codes from the catalog, in the order the worker picked them.
    pub services: Vec<String>,
    pub is_published: bool,
    pub setup_progress: SetupProgress,
    pub crm_contact_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    pub id: ClientId,
    pub user_id: UserId,
    pub phone: Option<String>,
    /// How the registering client relates to the participant ("self", "parent", ...).
    pub relationship: String,
    pub created_at: DateTime<Utc>,
}

/// The person receiving support, who may differ from the registering client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub client_id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub support_needs: Vec<String>,
}

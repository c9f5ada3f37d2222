use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AuditId, RequirementId, UserId, WorkerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    DocumentSubmitted,
    DocumentRemoved,
    RequirementApproved,
    RequirementRejected,
    RequirementReset,
    RequirementExpired,
    ProfilePublished,
    ProfileUnpublished,
}

/// Append-only record of who changed which compliance row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: AuditId,
    /// `None` for system actions such as the expiry sweep.
    pub actor: Option<UserId>,
    pub action: AuditAction,
    pub worker_id: WorkerId,
    pub requirement_id: Option<RequirementId>,
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: Option<UserId>,
        action: AuditAction,
        worker_id: WorkerId,
        requirement_id: Option<RequirementId>,
        detail: Option<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditId::new(),
            actor,
            action,
            worker_id,
            requirement_id,
            detail,
            recorded_at,
        }
    }
}

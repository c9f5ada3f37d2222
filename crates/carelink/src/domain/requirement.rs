use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RequirementId, WorkerId};

/// Lifecycle state of a verification requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementStatus {
    Pending,
    Submitted,
    Approved,
    Rejected,
    Expired,
}

impl RequirementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequirementStatus::Pending => "pending",
            RequirementStatus::Submitted => "submitted",
            RequirementStatus::Approved => "approved",
            RequirementStatus::Rejected => "rejected",
            RequirementStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse document tag stored alongside each requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    Primary,
    Secondary,
    WorkingRights,
    ServiceQualification,
}

impl DocumentCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "PRIMARY" => Some(Self::Primary),
            "SECONDARY" => Some(Self::Secondary),
            "WORKING_RIGHTS" => Some(Self::WorkingRights),
            "SERVICE_QUALIFICATION" => Some(Self::ServiceQualification),
            _ => None,
        }
    }
}

/// Document kind identifier, optionally namespaced as `service:docType`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementType(String);

impl RequirementType {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn namespaced(service: &str, doc_type: &str) -> Self {
        Self(format!("{service}:{doc_type}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `(service, docType)` for namespaced types.
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once(':')
    }

    pub fn service(&self) -> Option<&str> {
        self.split().map(|(service, _)| service)
    }

    /// The bare document kind: the suffix of a namespaced type, else the whole identifier.
    pub fn doc_type(&self) -> &str {
        self.split().map(|(_, doc)| doc).unwrap_or(&self.0)
    }
}

impl fmt::Display for RequirementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-form JSON kept with a requirement (e.g. `serviceTitle`).
pub type RequirementMetadata = serde_json::Map<String, serde_json::Value>;

/// Per-worker row tracking one compliance document through review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequirement {
    pub id: RequirementId,
    pub worker_id: WorkerId,
    pub requirement_type: RequirementType,
    pub requirement_name: String,
    pub document_category: Option<DocumentCategory>,
    pub status: RequirementStatus,
    pub document_url: Option<String>,
    /// Blob key backing `document_url`; internal to storage.
    #[serde(skip)]
    pub document_key: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub metadata: RequirementMetadata,
    /// Bumped by the repository on every stored change; writes carry the revision they read.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationRequirement {
    pub fn service_title(&self) -> Option<&str> {
        self.metadata
            .get("serviceTitle")
            .and_then(serde_json::Value::as_str)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == RequirementStatus::Approved
            && self.expires_at.is_some_and(|expires| expires <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_types_split_on_first_separator() {
        let kind = RequirementType::new("nursing:professional-indemnity");
        assert_eq!(kind.service(), Some("nursing"));
        assert_eq!(kind.doc_type(), "professional-indemnity");

        let plain = RequirementType::new(" police-check ");
        assert_eq!(plain.as_str(), "police-check");
        assert_eq!(plain.service(), None);
        assert_eq!(plain.doc_type(), "police-check");
    }

    #[test]
    fn categories_parse_loosely_and_serialize_upper_snake() {
        assert_eq!(
            DocumentCategory::parse("working-rights"),
            Some(DocumentCategory::WorkingRights)
        );
        assert_eq!(DocumentCategory::parse("unknown"), None);
        let json = serde_json::to_string(&DocumentCategory::ServiceQualification)
            .expect("category serializes");
        assert_eq!(json, "\"SERVICE_QUALIFICATION\"");
        let status = serde_json::to_string(&RequirementStatus::Submitted).expect("serializes");
        assert_eq!(status, "\"SUBMITTED\"");
    }
}

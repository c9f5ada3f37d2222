//! Outbound sync of marketplace accounts into Zoho CRM contacts.

mod token;
mod zoho;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use zoho::ZohoClient;

#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("crm transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("crm token refresh failed: {0}")]
    TokenRefresh(String),
    #[error("crm responded with {status}: {message}")]
    Api { status: u16, message: String },
    #[error("crm rejected record ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("unexpected crm payload: {0}")]
    Decode(String),
}

/// A Zoho `Contacts` record, using the module's API field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "First_Name", default)]
    pub first_name: Option<String>,
    #[serde(rename = "Last_Name", default)]
    pub last_name: Option<String>,
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
    #[serde(rename = "Phone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "Contact_Type", default, skip_serializing_if = "Option::is_none")]
    pub contact_type: Option<String>,
    #[serde(rename = "Platform_User_Id", default, skip_serializing_if = "Option::is_none")]
    pub platform_user_id: Option<String>,
    #[serde(rename = "Services_Offered", default, skip_serializing_if = "Option::is_none")]
    pub services_offered: Option<Vec<String>>,
}

/// CRM operations the registration job depends on.
#[async_trait]
pub trait CrmSync: Send + Sync {
    /// Creates or updates the contact keyed by email; returns the CRM record id.
    async fn upsert_contact(&self, contact: &CrmContact) -> Result<String, CrmError>;

    /// Every contact whose `field` equals `value`, across all result pages.
    async fn search_contacts(&self, field: &str, value: &str) -> Result<Vec<CrmContact>, CrmError>;
}

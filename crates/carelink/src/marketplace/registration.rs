use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::compliance::catalog;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Field name to message; serialized as the envelope's `fields` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRegistration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
}

impl WorkerRegistration {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_account(&mut errors, &self.email, &self.password, &self.first_name, &self.last_name);
        check_services(&mut errors, &self.services);
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRegistration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Relationship to the participant; `self` when omitted.
    #[serde(default)]
    pub relationship: Option<String>,
    /// The person receiving support, when it is not the registering client.
    #[serde(default)]
    pub participant: Option<ParticipantDetails>,
}

impl ClientRegistration {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_account(&mut errors, &self.email, &self.password, &self.first_name, &self.last_name);
        if let Some(participant) = &self.participant {
            require(&mut errors, "participant.firstName", &participant.first_name);
            require(&mut errors, "participant.lastName", &participant.last_name);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetails {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub support_needs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Editable worker profile fields. `services` replaces the current selection when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerProfileUpdate {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub services: Option<Vec<String>>,
}

impl WorkerProfileUpdate {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(services) = &self.services {
            check_services(&mut errors, services);
        }
        errors.into_result()
    }
}

/// Emails compare case-insensitively; stored trimmed and lowercased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Trimmed, lowercased, de-duplicated service codes in selection order.
pub fn normalize_services(services: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(services.len());
    for code in services {
        let code = code.trim().to_ascii_lowercase();
        if !code.is_empty() && !normalized.contains(&code) {
            normalized.push(code);
        }
    }
    normalized
}

/// Trims optional free text, dropping blanks.
pub fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn check_account(
    errors: &mut ValidationErrors,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) {
    if !looks_like_email(&normalize_email(email)) {
        errors.add("email", "must be a valid email address");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", format!("must be at least {MIN_PASSWORD_LEN} characters"));
    }
    require(errors, "firstName", first_name);
    require(errors, "lastName", last_name);
}

fn check_services(errors: &mut ValidationErrors, services: &[String]) {
    let normalized = normalize_services(services);
    if normalized.is_empty() {
        errors.add("services", "select at least one service");
        return;
    }
    let unknown: Vec<&str> = normalized
        .iter()
        .map(String::as_str)
        .filter(|code| catalog::service(code).is_none())
        .collect();
    if !unknown.is_empty() {
        errors.add("services", format!("unknown services: {}", unknown.join(", ")));
    }
}

fn require(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "is required");
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

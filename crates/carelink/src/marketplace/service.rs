use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::password::{PasswordDigest, PasswordError};
use super::registration::{
    clean_optional, normalize_email, normalize_services, ClientRegistration, LoginRequest,
    ValidationErrors, WorkerProfileUpdate, WorkerRegistration,
};
use super::repository::{MarketplaceRepository, RepositoryError};
use super::session::{Session, SessionStore};
use crate::compliance::catalog::{self, RequiredDocument, RequirementGroup, RequirementSet};
use crate::compliance::steps::{apply_progress, generate_steps, SetupStep};
use crate::compliance::summary::{categorize, CategorizedDocuments};
use crate::compliance::transitions::{self, ReviewAction, TransitionError};
use crate::domain::{
    AuditAction, AuditEntry, ClientId, ClientProfile, DocumentCategory, Participant,
    ParticipantId, RequirementId, RequirementStatus, RequirementType, Role, User, UserId,
    VerificationRequirement, WorkerId, WorkerProfile,
};
use crate::integrations::blob::{document_key, BlobError, BlobStore};
use crate::integrations::jobs::{Job, JobQueue, WorkerRegistrationJob};

/// Registration, onboarding, and compliance review over the storage, blob, and job seams.
pub struct MarketplaceService {
    repository: Arc<dyn MarketplaceRepository>,
    blobs: Arc<dyn BlobStore>,
    jobs: Arc<dyn JobQueue>,
    sessions: SessionStore,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRegistered {
    pub session: Session,
    pub user: User,
    pub profile: WorkerProfile,
    pub requirements: RequirementSet,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRegistered {
    pub session: Session,
    pub user: User,
    pub profile: ClientProfile,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
    pub session: Session,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientOverview {
    pub user: User,
    pub profile: ClientProfile,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressUpdate {
    pub slug: String,
    #[serde(default = "completed_by_default")]
    pub completed: bool,
}

fn completed_by_default() -> bool {
    true
}

/// A document a worker is submitting for one requirement.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub requirement_type: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject { reason: String },
    Reset,
}

impl ReviewDecision {
    fn action(&self) -> ReviewAction {
        match self {
            ReviewDecision::Approve => ReviewAction::Approve,
            ReviewDecision::Reject { .. } => ReviewAction::Reject,
            ReviewDecision::Reset => ReviewAction::Reset,
        }
    }

    fn audit_action(&self) -> AuditAction {
        match self {
            ReviewDecision::Approve => AuditAction::RequirementApproved,
            ReviewDecision::Reject { .. } => AuditAction::RequirementRejected,
            ReviewDecision::Reset => AuditAction::RequirementReset,
        }
    }
}

impl MarketplaceService {
    pub fn new(
        repository: Arc<dyn MarketplaceRepository>,
        blobs: Arc<dyn BlobStore>,
        jobs: Arc<dyn JobQueue>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            repository,
            blobs,
            jobs,
            sessions,
        }
    }

    pub fn register_worker(
        &self,
        registration: WorkerRegistration,
    ) -> Result<WorkerRegistered, MarketplaceError> {
        registration.validate().map_err(MarketplaceError::Validation)?;
        let user = self.new_user(
            Role::Worker,
            &registration.email,
            &registration.password,
            &registration.first_name,
            &registration.last_name,
        )?;

        let now = user.created_at;
        let services = normalize_services(&registration.services);
        let profile = WorkerProfile {
            id: WorkerId::new(),
            user_id: user.id,
            phone: clean_optional(registration.phone.as_deref()),
            suburb: clean_optional(registration.suburb.as_deref()),
            bio: clean_optional(registration.bio.as_deref()),
            services,
            is_published: false,
            setup_progress: Default::default(),
            crm_contact_id: None,
            created_at: now,
            updated_at: now,
        };
        let rows: Vec<VerificationRequirement> = catalog::requirements_for_services(&profile.services)
            .iter()
            .map(|document| document.to_pending(profile.id, now))
            .collect();
        let requirements = RequirementSet::from_requirements(&rows);

        self.repository
            .register_worker(user.clone(), profile.clone(), rows)
            .map_err(email_conflict)?;
        info!(worker_id = %profile.id, requirements = requirements.len(), "worker registered");

        self.enqueue(Job::WorkerRegistration(WorkerRegistrationJob {
            worker_id: profile.id,
            user_id: user.id,
        }));

        Ok(WorkerRegistered {
            session: self.sessions.open(user.id, Role::Worker),
            user,
            profile,
            requirements,
        })
    }

    pub fn register_client(
        &self,
        registration: ClientRegistration,
    ) -> Result<ClientRegistered, MarketplaceError> {
        registration.validate().map_err(MarketplaceError::Validation)?;
        let user = self.new_user(
            Role::Client,
            &registration.email,
            &registration.password,
            &registration.first_name,
            &registration.last_name,
        )?;

        let profile = ClientProfile {
            id: ClientId::new(),
            user_id: user.id,
            phone: clean_optional(registration.phone.as_deref()),
            relationship: clean_optional(registration.relationship.as_deref())
                .unwrap_or_else(|| "self".to_string()),
            created_at: user.created_at,
        };
        let participant = match registration.participant {
            Some(details) => Participant {
                id: ParticipantId::new(),
                client_id: profile.id,
                first_name: details.first_name.trim().to_string(),
                last_name: details.last_name.trim().to_string(),
                date_of_birth: details.date_of_birth,
                support_needs: details.support_needs,
            },
            None => Participant {
                id: ParticipantId::new(),
                client_id: profile.id,
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                date_of_birth: None,
                support_needs: Vec::new(),
            },
        };
        let participants = vec![participant];

        self.repository
            .register_client(user.clone(), profile.clone(), participants.clone())
            .map_err(email_conflict)?;
        info!(client_id = %profile.id, "client registered");

        Ok(ClientRegistered {
            session: self.sessions.open(user.id, Role::Client),
            user,
            profile,
            participants,
        })
    }

    pub fn login(&self, request: LoginRequest) -> Result<SignedIn, MarketplaceError> {
        let email = normalize_email(&request.email);
        let user = self
            .repository
            .find_user_by_email(&email)?
            .filter(|user| user.password.verify(&request.password))
            .ok_or(MarketplaceError::InvalidCredentials)?;

        Ok(SignedIn {
            session: self.sessions.open(user.id, user.role),
            user,
        })
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    /// Resolves the bearer token and requires `role`.
    pub fn authorize(&self, token: Option<&str>, role: Role) -> Result<Session, MarketplaceError> {
        let session = token
            .and_then(|token| self.sessions.resolve(token))
            .ok_or(MarketplaceError::Unauthenticated)?;
        if session.role != role {
            return Err(MarketplaceError::Forbidden(role));
        }
        Ok(session)
    }

    pub fn authenticate(&self, token: Option<&str>) -> Result<Session, MarketplaceError> {
        token
            .and_then(|token| self.sessions.resolve(token))
            .ok_or(MarketplaceError::Unauthenticated)
    }

    pub fn current_user(&self, session: &Session) -> Result<User, MarketplaceError> {
        self.repository
            .fetch_user(session.user_id)?
            .ok_or(MarketplaceError::NotFound("user"))
    }

    /// Creates the admin account if no account holds `email` yet.
    pub fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, MarketplaceError> {
        let email = normalize_email(email);
        if self.repository.find_user_by_email(&email)?.is_some() {
            return Ok(None);
        }
        let user = User {
            id: UserId::new(),
            email,
            first_name: "Platform".to_string(),
            last_name: "Admin".to_string(),
            role: Role::Admin,
            password: PasswordDigest::create(password)?,
            created_at: Utc::now(),
        };
        self.repository.insert_user(user.clone()).map_err(email_conflict)?;
        info!(user_id = %user.id, "admin account created");
        Ok(Some(user))
    }

    pub fn worker_profile(&self, session: &Session) -> Result<WorkerProfile, MarketplaceError> {
        self.repository
            .worker_for_user(session.user_id)?
            .ok_or(MarketplaceError::NotFound("worker profile"))
    }

    /// Applies profile edits. Newly selected services gain PENDING requirements, which takes a
    /// published listing down; rows for dropped services are kept.
    pub fn update_worker_profile(
        &self,
        session: &Session,
        update: WorkerProfileUpdate,
    ) -> Result<WorkerProfile, MarketplaceError> {
        update.validate().map_err(MarketplaceError::Validation)?;
        let worker = self.worker_profile(session)?;
        let now = Utc::now();

        let profile = self.repository.modify_worker_profile(worker.id, &mut |profile| {
            if let Some(phone) = update.phone.as_deref() {
                profile.phone = clean_optional(Some(phone));
            }
            if let Some(suburb) = update.suburb.as_deref() {
                profile.suburb = clean_optional(Some(suburb));
            }
            if let Some(bio) = update.bio.as_deref() {
                profile.bio = clean_optional(Some(bio));
            }
            if let Some(services) = &update.services {
                profile.services = normalize_services(services);
            }
            profile.updated_at = now;
        })?;

        let mut added = None;
        if update.services.is_some() {
            let existing = self.repository.requirements(profile.id)?;
            for document in catalog::requirements_for_services(&profile.services).iter() {
                if existing
                    .iter()
                    .any(|row| row.requirement_type == document.requirement_type)
                {
                    continue;
                }
                let row = document.to_pending(profile.id, now);
                match self.repository.insert_requirement(row.clone()) {
                    Ok(()) => {
                        added.get_or_insert(row);
                    }
                    Err(RepositoryError::Conflict(_)) => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }

        match added {
            Some(cause) => {
                self.withdraw_listing(Some(session.user_id), profile.id, &cause)?;
                self.require_worker(profile.id)
            }
            None => Ok(profile),
        }
    }

    pub fn worker_requirements(&self, session: &Session) -> Result<RequirementSet, MarketplaceError> {
        let worker = self.worker_profile(session)?;
        let rows = self.repository.requirements(worker.id)?;
        Ok(RequirementSet::from_requirements(&rows))
    }

    pub fn setup_steps(&self, session: &Session) -> Result<Vec<SetupStep>, MarketplaceError> {
        let worker = self.worker_profile(session)?;
        self.steps_for(&worker)
    }

    fn steps_for(&self, worker: &WorkerProfile) -> Result<Vec<SetupStep>, MarketplaceError> {
        let rows = self.repository.requirements(worker.id)?;
        let mut steps = generate_steps(&RequirementSet::from_requirements(&rows));
        apply_progress(&mut steps, &worker.setup_progress);
        Ok(steps)
    }

    pub fn update_setup_progress(
        &self,
        session: &Session,
        update: ProgressUpdate,
    ) -> Result<Vec<SetupStep>, MarketplaceError> {
        let worker = self.worker_profile(session)?;
        let slug = update.slug.trim().to_string();
        let steps = self.steps_for(&worker)?;
        if !steps.iter().any(|step| step.slug == slug) {
            return Err(MarketplaceError::UnknownStep(slug));
        }

        let now = Utc::now();
        let worker = self.repository.modify_worker_profile(worker.id, &mut |profile| {
            profile.setup_progress.insert(slug.clone(), update.completed);
            profile.updated_at = now;
        })?;

        let mut steps = steps;
        apply_progress(&mut steps, &worker.setup_progress);
        Ok(steps)
    }

    /// Stores the file and moves the worker's row for that type to SUBMITTED, creating the
    /// row when the worker has none yet.
    pub fn upload_document(
        &self,
        session: &Session,
        upload: DocumentUpload,
    ) -> Result<VerificationRequirement, MarketplaceError> {
        let worker = self.worker_profile(session)?;
        let kind = RequirementType::new(upload.requirement_type.as_str());
        if kind.as_str().is_empty() {
            let mut errors = ValidationErrors::default();
            errors.add("requirementType", "is required");
            return Err(MarketplaceError::Validation(errors));
        }
        if upload.bytes.is_empty() {
            let mut errors = ValidationErrors::default();
            errors.add("file", "is empty");
            return Err(MarketplaceError::Validation(errors));
        }

        let existing = self.repository.requirement_by_type(worker.id, &kind)?;
        let is_new = existing.is_none();
        let mut row = match existing {
            Some(row) => row,
            None => uploadable_document(&kind)?.to_pending(worker.id, Utc::now()),
        };
        let now = Utc::now();
        let replaced_key = row.document_key.take();
        transitions::apply(&mut row, ReviewAction::Submit, now, None)?;

        let key = document_key(worker.id, &kind, &upload.file_name);
        let stored = self.blobs.put(&key, &upload.bytes, &upload.content_type)?;
        row.document_url = Some(stored.url.clone());
        row.document_key = Some(stored.key.clone());
        row.uploaded_at = Some(now);
        row.expires_at = upload.expires_at;
        row.notes = clean_optional(upload.notes.as_deref());

        let saved = if is_new {
            self.repository.insert_requirement(row.clone()).map(|()| row)
        } else {
            self.repository.update_requirement(row)
        };
        let row = match saved {
            Ok(row) => row,
            Err(err) => {
                self.discard_blob(&stored.key);
                return Err(err.into());
            }
        };
        if let Some(old) = replaced_key {
            self.discard_blob(&old);
        }

        self.audit(
            Some(session.user_id),
            AuditAction::DocumentSubmitted,
            worker.id,
            Some(row.id),
            Some(format!("{} ({} bytes)", kind, stored.size)),
        );
        info!(worker_id = %worker.id, requirement = %kind, "document submitted");
        self.withdraw_listing(Some(session.user_id), worker.id, &row)?;
        Ok(row)
    }

    /// Withdraws an uploaded document. Rows the worker's services require revert to PENDING;
    /// other rows are deleted. Approved documents are locked.
    pub fn remove_document(
        &self,
        session: &Session,
        requirement_id: RequirementId,
    ) -> Result<(), MarketplaceError> {
        let worker = self.worker_profile(session)?;
        let row = self
            .repository
            .requirement(requirement_id)?
            .filter(|row| row.worker_id == worker.id)
            .ok_or(MarketplaceError::NotFound("requirement"))?;
        if row.status == RequirementStatus::Approved {
            return Err(MarketplaceError::DocumentLocked);
        }

        let required = catalog::requirements_for_services(&worker.services)
            .iter()
            .any(|document| document.requirement_type == row.requirement_type);
        if required {
            let mut cleared = row.clone();
            cleared.status = RequirementStatus::Pending;
            cleared.document_url = None;
            cleared.document_key = None;
            cleared.uploaded_at = None;
            cleared.submitted_at = None;
            cleared.reviewed_at = None;
            cleared.approved_at = None;
            cleared.rejected_at = None;
            cleared.rejection_reason = None;
            cleared.expires_at = None;
            cleared.updated_at = Utc::now();
            self.repository.update_requirement(cleared)?;
        } else {
            self.repository.delete_requirement(row.id, row.revision)?;
        }
        if let Some(key) = &row.document_key {
            self.discard_blob(key);
        }

        self.audit(
            Some(session.user_id),
            AuditAction::DocumentRemoved,
            worker.id,
            Some(row.id),
            Some(row.requirement_type.to_string()),
        );
        Ok(())
    }

    pub fn client_profile(&self, session: &Session) -> Result<ClientOverview, MarketplaceError> {
        let user = self.current_user(session)?;
        let profile = self
            .repository
            .client_for_user(session.user_id)?
            .ok_or(MarketplaceError::NotFound("client profile"))?;
        let participants = self.repository.participants(profile.id)?;
        Ok(ClientOverview {
            user,
            profile,
            participants,
        })
    }

    pub fn categorized_documents(
        &self,
        worker_id: WorkerId,
    ) -> Result<CategorizedDocuments, MarketplaceError> {
        self.require_worker(worker_id)?;
        let rows = self.repository.requirements(worker_id)?;
        Ok(categorize(worker_id, rows))
    }

    /// Applies an admin decision as a revision-guarded update. A published worker whose
    /// requirement stops being approved is unpublished.
    pub fn review(
        &self,
        actor: &Session,
        requirement_id: RequirementId,
        decision: ReviewDecision,
    ) -> Result<VerificationRequirement, MarketplaceError> {
        let reason = match &decision {
            ReviewDecision::Reject { reason } => {
                let reason = reason.trim();
                if reason.is_empty() {
                    let mut errors = ValidationErrors::default();
                    errors.add("reason", "is required when rejecting");
                    return Err(MarketplaceError::Validation(errors));
                }
                Some(reason.to_string())
            }
            _ => None,
        };

        let mut row = self
            .repository
            .requirement(requirement_id)?
            .ok_or(MarketplaceError::NotFound("requirement"))?;
        let action = decision.action();
        let previous = transitions::apply(&mut row, action, Utc::now(), reason.clone())
            .inspect_err(|err| warn!(%requirement_id, error = %err, "review refused"))?;
        let row = self.repository.update_requirement(row)?;

        self.audit(
            Some(actor.user_id),
            decision.audit_action(),
            row.worker_id,
            Some(row.id),
            reason,
        );
        info!(%requirement_id, %action, from = %previous, to = %row.status, "requirement reviewed");

        if row.status != RequirementStatus::Approved {
            self.withdraw_listing(Some(actor.user_id), row.worker_id, &row)?;
        }
        Ok(row)
    }

    /// Publishing requires at least one requirement and every requirement APPROVED.
    pub fn set_published(
        &self,
        actor: &Session,
        worker_id: WorkerId,
        publish: bool,
    ) -> Result<WorkerProfile, MarketplaceError> {
        self.require_worker(worker_id)?;
        if publish {
            let rows = self.repository.requirements(worker_id)?;
            let outstanding = rows
                .iter()
                .filter(|row| row.status != RequirementStatus::Approved)
                .count();
            if rows.is_empty() || outstanding > 0 {
                return Err(MarketplaceError::NotPublishable { outstanding });
            }
        }

        let now = Utc::now();
        let profile = self.repository.modify_worker_profile(worker_id, &mut |profile| {
            profile.is_published = publish;
            profile.updated_at = now;
        })?;
        let action = if publish {
            AuditAction::ProfilePublished
        } else {
            AuditAction::ProfileUnpublished
        };
        self.audit(Some(actor.user_id), action, worker_id, None, None);
        info!(%worker_id, published = publish, "worker listing updated");
        Ok(profile)
    }

    pub fn audit_trail(&self, worker_id: WorkerId) -> Result<Vec<AuditEntry>, MarketplaceError> {
        self.require_worker(worker_id)?;
        Ok(self.repository.audit_trail(worker_id)?)
    }

    /// Moves APPROVED rows whose `expires_at` has passed to EXPIRED. Rows changed concurrently
    /// are skipped until the next sweep.
    pub fn expire_documents(&self, now: DateTime<Utc>) -> Result<usize, MarketplaceError> {
        let mut expired = 0;
        for mut row in self.repository.approved_expiring_before(now)? {
            let requirement_id = row.id;
            transitions::apply(&mut row, ReviewAction::Expire, now, None)?;
            let row = match self.repository.update_requirement(row) {
                Ok(row) => row,
                Err(RepositoryError::Conflict(_) | RepositoryError::NotFound) => {
                    warn!(%requirement_id, "requirement changed during expiry sweep");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            expired += 1;
            self.audit(None, AuditAction::RequirementExpired, row.worker_id, Some(row.id), None);
            self.withdraw_listing(None, row.worker_id, &row)?;
        }
        if expired > 0 {
            info!(expired, "expired approved documents");
        }
        Ok(expired)
    }

    fn new_user(
        &self,
        role: Role,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, MarketplaceError> {
        let email = normalize_email(email);
        if self.repository.find_user_by_email(&email)?.is_some() {
            return Err(MarketplaceError::EmailTaken);
        }
        Ok(User {
            id: UserId::new(),
            email,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            role,
            password: PasswordDigest::create(password)?,
            created_at: Utc::now(),
        })
    }

    fn require_worker(&self, worker_id: WorkerId) -> Result<WorkerProfile, MarketplaceError> {
        self.repository
            .worker_profile(worker_id)?
            .ok_or(MarketplaceError::NotFound("worker"))
    }

    fn withdraw_listing(
        &self,
        actor: Option<UserId>,
        worker_id: WorkerId,
        cause: &VerificationRequirement,
    ) -> Result<(), MarketplaceError> {
        let mut withdrawn = false;
        self.repository.modify_worker_profile(worker_id, &mut |profile| {
            if profile.is_published {
                profile.is_published = false;
                profile.updated_at = Utc::now();
                withdrawn = true;
            }
        })?;
        if withdrawn {
            self.audit(
                actor,
                AuditAction::ProfileUnpublished,
                worker_id,
                Some(cause.id),
                Some(format!("{} is {}", cause.requirement_type, cause.status)),
            );
            info!(%worker_id, "worker listing withdrawn");
        }
        Ok(())
    }

    fn enqueue(&self, job: Job) {
        let name = job.name();
        match self.jobs.send(job) {
            Ok(Some(job_id)) => info!(%job_id, job = name, "job queued"),
            Ok(None) => warn!(job = name, "job queue declined job"),
            Err(err) => error!(job = name, error = %err, "failed to queue job"),
        }
    }

    fn audit(
        &self,
        actor: Option<UserId>,
        action: AuditAction,
        worker_id: WorkerId,
        requirement_id: Option<RequirementId>,
        detail: Option<String>,
    ) {
        let entry = AuditEntry::new(actor, action, worker_id, requirement_id, detail, Utc::now());
        if let Err(err) = self.repository.append_audit(entry) {
            error!(%worker_id, ?action, error = %err, "failed to append audit entry");
        }
    }

    fn discard_blob(&self, key: &str) {
        if let Err(err) = self.blobs.delete(key) {
            warn!(key, error = %err, "failed to delete stored document");
        }
    }
}

/// Catalog entry for an upload, or an ad-hoc qualification under a known service.
fn uploadable_document(kind: &RequirementType) -> Result<RequiredDocument, MarketplaceError> {
    if let Some(document) = catalog::describe(kind) {
        return Ok(document);
    }
    let service = kind
        .service()
        .and_then(catalog::service)
        .filter(|_| !kind.doc_type().is_empty())
        .ok_or_else(|| MarketplaceError::UnknownRequirement(kind.to_string()))?;
    Ok(RequiredDocument {
        requirement_type: kind.clone(),
        name: title_case(kind.doc_type()),
        category: Some(DocumentCategory::ServiceQualification),
        group: RequirementGroup::Qualification,
        service_title: Some(service.title.to_string()),
        requirement_id: None,
        status: None,
    })
}

fn title_case(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn email_conflict(err: RepositoryError) -> MarketplaceError {
    match err {
        RepositoryError::Conflict(_) => MarketplaceError::EmailTaken,
        other => other.into(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("unknown requirement type '{0}'")]
    UnknownRequirement(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("{0} role required")]
    Forbidden(Role),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("unknown setup step '{0}'")]
    UnknownStep(String),
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("approved documents cannot be removed")]
    DocumentLocked,
    #[error("profile cannot be published: {outstanding} requirement(s) not approved")]
    NotPublishable { outstanding: usize },
    #[error("{0}; reload and retry")]
    Conflict(String),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("background task failed: {0}")]
    TaskFailed(String),
}

impl From<RepositoryError> for MarketplaceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            RepositoryError::NotFound => Self::NotFound("record"),
            other => Self::Repository(other),
        }
    }
}

impl MarketplaceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MarketplaceError::Validation(_) | MarketplaceError::UnknownRequirement(_) => {
                StatusCode::BAD_REQUEST
            }
            MarketplaceError::Unauthenticated | MarketplaceError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            MarketplaceError::Forbidden(_) => StatusCode::FORBIDDEN,
            MarketplaceError::NotFound(_) | MarketplaceError::UnknownStep(_) => {
                StatusCode::NOT_FOUND
            }
            MarketplaceError::EmailTaken
            | MarketplaceError::Transition(_)
            | MarketplaceError::DocumentLocked
            | MarketplaceError::NotPublishable { .. }
            | MarketplaceError::Conflict(_) => StatusCode::CONFLICT,
            MarketplaceError::Repository(_)
            | MarketplaceError::Blob(_)
            | MarketplaceError::Password(_)
            | MarketplaceError::TaskFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

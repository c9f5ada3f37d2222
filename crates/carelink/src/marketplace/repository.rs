use chrono::{DateTime, Utc};

use crate::domain::{
    AuditEntry, ClientId, ClientProfile, Participant, RequirementId, RequirementType, User, UserId, VerificationRequirement, WorkerId, WorkerProfile,
};

/// Storage seam for accounts, profiles, requirements, and the audit log.
///
/// Each method is one atomic unit of work. Multi-row writes (registration) either land
/// completely or not at all.
pub trait MarketplaceRepository: Send + Sync {
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    /// Fails with `Conflict` when the email is taken.
    fn insert_user(&self, user: User) -> Result<(), RepositoryError>;

    fn register_worker(
        &self,
        user: User,
        profile: WorkerProfile,
        requirements: Vec<VerificationRequirement>,
    ) -> Result<(), RepositoryError>;
    fn register_client(
        &self,
        user: User,
        profile: ClientProfile,
        participants: Vec<Participant>,
    ) -> Result<(), RepositoryError>;

    fn worker_profile(&self, id: WorkerId) -> Result<Option<WorkerProfile>, RepositoryError>;
    fn worker_for_user(&self, user_id: UserId) -> Result<Option<WorkerProfile>, RepositoryError>;
    /// Applies `change` under the repository lock and returns the stored result.
    fn modify_worker_profile(
        &self,
        id: WorkerId,
        change: &mut dyn FnMut(&mut WorkerProfile),
    ) -> Result<WorkerProfile, RepositoryError>;

    fn client_for_user(&self, user_id: UserId) -> Result<Option<ClientProfile>, RepositoryError>;
    fn participants(&self, client_id: ClientId) -> Result<Vec<Participant>, RepositoryError>;

    fn requirements(&self, worker_id: WorkerId) -> Result<Vec<VerificationRequirement>, RepositoryError>;
    fn requirement(&self, id: RequirementId) -> Result<Option<VerificationRequirement>, RepositoryError>;
    fn requirement_by_type(
        &self,
        worker_id: WorkerId,
        kind: &RequirementType,
    ) -> Result<Option<VerificationRequirement>, RepositoryError>;
    /// Fails with `Conflict` when the worker already has a row of the same type.
    fn insert_requirement(&self, requirement: VerificationRequirement) -> Result<(), RepositoryError>;
    /// Replaces the row only if the stored revision still equals `requirement.revision`, and
    /// returns the stored row with its revision bumped. Fails with `Conflict` otherwise.
    fn update_requirement(
        &self,
        requirement: VerificationRequirement,
    ) -> Result<VerificationRequirement, RepositoryError>;
    /// Removes the row only if its stored revision still equals `expected_revision`.
    fn delete_requirement(
        &self,
        id: RequirementId,
        expected_revision: u64,
    ) -> Result<VerificationRequirement, RepositoryError>;
    /// APPROVED rows whose `expires_at` is at or before `cutoff`.
    fn approved_expiring_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<VerificationRequirement>, RepositoryError>;

    fn append_audit(&self, entry: AuditEntry) -> Result<(), RepositoryError>;
    fn audit_trail(&self, worker_id: WorkerId) -> Result<Vec<AuditEntry>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

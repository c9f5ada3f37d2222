use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::repository::{MarketplaceRepository, RepositoryError};
use crate::domain::{
    AuditEntry, ClientId, ClientProfile, Participant, RequirementId, RequirementType, User, UserId, VerificationRequirement, WorkerId, WorkerProfile,
};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    emails: HashMap<String, UserId>,
    workers: HashMap<WorkerId, WorkerProfile>,
    clients: HashMap<ClientId, ClientProfile>,
    participants: Vec<Participant>,
    /// Insertion order is the order requirements are listed in.
    requirements: Vec<VerificationRequirement>,
    audit: Vec<AuditEntry>,
}

impl State {
    fn claim_email(&self, user: &User) -> Result<(), RepositoryError> {
        if self.emails.contains_key(&user.email) {
            return Err(RepositoryError::Conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }
        Ok(())
    }

    fn add_user(&mut self, user: User) {
        self.emails.insert(user.email.clone(), user.id);
        self.users.insert(user.id, user);
    }

    fn requirement_index(&self, id: RequirementId) -> Option<usize> {
        self.requirements.iter().position(|row| row.id == id)
    }

    fn has_requirement_type(&self, worker_id: WorkerId, kind: &RequirementType) -> bool {
        self.requirements
            .iter()
            .any(|row| row.worker_id == worker_id && &row.requirement_type == kind)
    }

    fn guard_revision(&self, index: usize, expected: u64) -> Result<(), RepositoryError> {
        let current = self.requirements[index].revision;
        if current != expected {
            return Err(RepositoryError::Conflict(format!(
                "requirement changed since it was read (revision {current}, expected {expected})"
            )));
        }
        Ok(())
    }
}

/// Mutex-guarded repository used by the service binary and the tests.
#[derive(Default)]
pub struct InMemoryMarketplace {
    state: Mutex<State>,
}

impl InMemoryMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".into()))
    }
}

impl MarketplaceRepository for InMemoryMarketplace {
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .emails
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    fn insert_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state.claim_email(&user)?;
        state.add_user(user);
        Ok(())
    }

    fn register_worker(
        &self,
        user: User,
        profile: WorkerProfile,
        requirements: Vec<VerificationRequirement>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state.claim_email(&user)?;
        state.add_user(user);
        state.requirements.extend(requirements);
        state.workers.insert(profile.id, profile);
        Ok(())
    }

    fn register_client(
        &self,
        user: User,
        profile: ClientProfile,
        participants: Vec<Participant>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state.claim_email(&user)?;
        state.add_user(user);
        state.participants.extend(participants);
        state.clients.insert(profile.id, profile);
        Ok(())
    }

    fn worker_profile(&self, id: WorkerId) -> Result<Option<WorkerProfile>, RepositoryError> {
        Ok(self.state()?.workers.get(&id).cloned())
    }

    fn worker_for_user(&self, user_id: UserId) -> Result<Option<WorkerProfile>, RepositoryError> {
        Ok(self
            .state()?
            .workers
            .values()
            .find(|profile| profile.user_id == user_id)
            .cloned())
    }

    fn modify_worker_profile(
        &self,
        id: WorkerId,
        change: &mut dyn FnMut(&mut WorkerProfile),
    ) -> Result<WorkerProfile, RepositoryError> {
        let mut state = self.state()?;
        let profile = state.workers.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        change(profile);
        Ok(profile.clone())
    }

    fn client_for_user(&self, user_id: UserId) -> Result<Option<ClientProfile>, RepositoryError> {
        Ok(self
            .state()?
            .clients
            .values()
            .find(|profile| profile.user_id == user_id)
            .cloned())
    }

    fn participants(&self, client_id: ClientId) -> Result<Vec<Participant>, RepositoryError> {
        Ok(self
            .state()?
            .participants
            .iter()
            .filter(|participant| participant.client_id == client_id)
            .cloned()
            .collect())
    }

    fn requirements(&self, worker_id: WorkerId) -> Result<Vec<VerificationRequirement>, RepositoryError> {
        Ok(self
            .state()?
            .requirements
            .iter()
            .filter(|row| row.worker_id == worker_id)
            .cloned()
            .collect())
    }

    fn requirement(&self, id: RequirementId) -> Result<Option<VerificationRequirement>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .requirement_index(id)
            .map(|index| state.requirements[index].clone()))
    }

    fn requirement_by_type(
        &self,
        worker_id: WorkerId,
        kind: &RequirementType,
    ) -> Result<Option<VerificationRequirement>, RepositoryError> {
        Ok(self
            .state()?
            .requirements
            .iter()
            .find(|row| row.worker_id == worker_id && &row.requirement_type == kind)
            .cloned())
    }

    fn insert_requirement(&self, requirement: VerificationRequirement) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.has_requirement_type(requirement.worker_id, &requirement.requirement_type) {
            return Err(RepositoryError::Conflict(format!(
                "worker already has a {} requirement",
                requirement.requirement_type
            )));
        }
        state.requirements.push(requirement);
        Ok(())
    }

    fn update_requirement(
        &self,
        mut requirement: VerificationRequirement,
    ) -> Result<VerificationRequirement, RepositoryError> {
        let mut state = self.state()?;
        let index = state
            .requirement_index(requirement.id)
            .ok_or(RepositoryError::NotFound)?;
        state.guard_revision(index, requirement.revision)?;
        requirement.revision += 1;
        state.requirements[index] = requirement.clone();
        Ok(requirement)
    }

    fn delete_requirement(
        &self,
        id: RequirementId,
        expected_revision: u64,
    ) -> Result<VerificationRequirement, RepositoryError> {
        let mut state = self.state()?;
        let index = state.requirement_index(id).ok_or(RepositoryError::NotFound)?;
        state.guard_revision(index, expected_revision)?;
        Ok(state.requirements.remove(index))
    }

    fn approved_expiring_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<VerificationRequirement>, RepositoryError> {
        Ok(self
            .state()?
            .requirements
            .iter()
            .filter(|row| row.is_expired_at(cutoff))
            .cloned()
            .collect())
    }

    fn append_audit(&self, entry: AuditEntry) -> Result<(), RepositoryError> {
        self.state()?.audit.push(entry);
        Ok(())
    }

    fn audit_trail(&self, worker_id: WorkerId) -> Result<Vec<AuditEntry>, RepositoryError> {
        Ok(self
            .state()?
            .audit
            .iter()
            .filter(|entry| entry.worker_id == worker_id)
            .cloned()
            .collect())
    }
}

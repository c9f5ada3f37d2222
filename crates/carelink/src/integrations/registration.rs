use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::crm::{CrmContact, CrmSync};
use super::jobs::{Job, JobError, JobHandler, JobId, WorkerRegistrationJob};
use crate::marketplace::repository::MarketplaceRepository;

/// Progress flag set once the post-registration job has run.
pub const REGISTRATION_PROCESSED: &str = "registration_processed";
/// Progress flag set once the worker exists as a CRM contact.
pub const CRM_SYNCED: &str = "crm_synced";

const PLATFORM_USER_FIELD: &str = "Platform_User_Id";

/// Post-registration processing: mirrors the worker into the CRM when one is configured.
pub struct RegistrationJobHandler {
    repository: Arc<dyn MarketplaceRepository>,
    crm: Option<Arc<dyn CrmSync>>,
}

impl RegistrationJobHandler {
    pub fn new(repository: Arc<dyn MarketplaceRepository>, crm: Option<Arc<dyn CrmSync>>) -> Self {
        Self { repository, crm }
    }

    async fn process(&self, id: JobId, job: WorkerRegistrationJob) -> Result<(), JobError> {
        let user = self
            .repository
            .fetch_user(job.user_id)?
            .ok_or(JobError::MissingRecord("user"))?;
        let profile = self
            .repository
            .worker_profile(job.worker_id)?
            .ok_or(JobError::MissingRecord("worker profile"))?;

        let contact_id = match &self.crm {
            Some(crm) => {
                let platform_id = user.id.to_string();
                let existing = crm
                    .search_contacts(PLATFORM_USER_FIELD, &platform_id)
                    .await?
                    .into_iter()
                    .find_map(|contact| contact.id);
                let contact_id = match existing {
                    Some(contact_id) => contact_id,
                    None => {
                        let contact = CrmContact {
                            id: None,
                            first_name: Some(user.first_name.clone()),
                            last_name: Some(user.last_name.clone()),
                            email: Some(user.email.clone()),
                            phone: profile.phone.clone(),
                            contact_type: Some("Support Worker".to_string()),
                            platform_user_id: Some(platform_id),
                            services_offered: Some(profile.services.clone()),
                        };
                        crm.upsert_contact(&contact).await?
                    }
                };
                info!(%id, worker_id = %profile.id, %contact_id, "worker synced to crm");
                Some(contact_id)
            }
            None => {
                info!(%id, worker_id = %profile.id, "crm not configured; skipping contact sync");
                None
            }
        };

        self.repository.modify_worker_profile(profile.id, &mut |profile| {
            if let Some(contact_id) = &contact_id {
                profile.crm_contact_id = Some(contact_id.clone());
                profile.setup_progress.insert(CRM_SYNCED.to_string(), true);
            }
            profile.setup_progress.insert(REGISTRATION_PROCESSED.to_string(), true);
        })?;
        Ok(())
    }
}

#[async_trait]
impl JobHandler for RegistrationJobHandler {
    async fn handle(&self, id: JobId, job: Job) -> Result<(), JobError> {
        match job {
            Job::WorkerRegistration(payload) => self.process(id, payload).await,
        }
    }
}

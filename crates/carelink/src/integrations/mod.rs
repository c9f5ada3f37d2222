//! Adapters to systems outside the request path: document storage, the background job
//! queue, and the CRM.

pub mod blob;
pub mod crm;
pub mod jobs;
pub mod registration;

pub use blob::{BlobError, BlobStore, LocalBlobStore, StoredBlob};
pub use crm::{CrmContact, CrmError, CrmSync, ZohoClient};
pub use jobs::{ChannelJobQueue, Job, JobError, JobHandler, JobId, JobQueue, WorkerRegistrationJob};
pub use registration::RegistrationJobHandler;

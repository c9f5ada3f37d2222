use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::crm::CrmError;
use crate::domain::{UserId, WorkerId};
use crate::marketplace::repository::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Background work the marketplace hands off after a request completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "kebab-case")]
pub enum Job {
    WorkerRegistration(WorkerRegistrationJob),
}

impl Job {
    pub const fn name(&self) -> &'static str {
        match self {
            Job::WorkerRegistration(_) => "worker-registration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRegistrationJob {
    pub worker_id: WorkerId,
    pub user_id: UserId,
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job queue is closed")]
    Closed,
    #[error("job payload refers to missing {0}")]
    MissingRecord(&'static str),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Crm(#[from] CrmError),
}

/// Send side of the job queue. `Ok(None)` means the queue declined the job; callers log it
/// and carry on.
pub trait JobQueue: Send + Sync {
    fn send(&self, job: Job) -> Result<Option<JobId>, JobError>;
}

#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, id: JobId, job: Job) -> Result<(), JobError>;
}

struct QueuedJob {
    id: JobId,
    job: Job,
}

/// In-process queue: a bounded channel drained by one worker task.
#[derive(Clone)]
pub struct ChannelJobQueue {
    sender: mpsc::Sender<QueuedJob>,
}

impl ChannelJobQueue {
    /// Spawns the worker on the current tokio runtime. The worker stops once every queue
    /// handle has been dropped and the backlog is drained.
    pub fn start<H: JobHandler>(capacity: usize, handler: Arc<H>) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(receiver, handler));
        (Self { sender }, worker)
    }
}

impl JobQueue for ChannelJobQueue {
    fn send(&self, job: Job) -> Result<Option<JobId>, JobError> {
        let id = JobId::new();
        match self.sender.try_send(QueuedJob { id, job }) {
            Ok(()) => Ok(Some(id)),
            Err(TrySendError::Full(queued)) => {
                warn!(job = queued.job.name(), "job queue full; job declined");
                Ok(None)
            }
            Err(TrySendError::Closed(_)) => Err(JobError::Closed),
        }
    }
}

async fn run_worker<H: JobHandler>(mut receiver: mpsc::Receiver<QueuedJob>, handler: Arc<H>) {
    while let Some(QueuedJob { id, job }) = receiver.recv().await {
        let name = job.name();
        match handler.handle(id, job).await {
            Ok(()) => info!(%id, job = name, "job completed"),
            Err(err) => error!(%id, job = name, error = %err, "job failed"),
        }
    }
    info!("job queue drained");
}

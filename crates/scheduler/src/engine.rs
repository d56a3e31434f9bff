//! Boundary between the scheduler and whatever actually executes a job.
//!
//! The scheduler calls [`ExecutionEngine::start`] once per dispatched job.
//! The engine reports back through the [`JobReporter`] in its [`JobContext`]
//! (or the equivalent `Scheduler::report_*` methods).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, Result};
use crate::job::{Job, JobId};
use crate::journal::StepResult;
use crate::runner::Scheduler;

/// Executes dispatched jobs (OCR pipelines, model training, ...).
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Begin executing a job.
    ///
    /// Returning `Err` (or panicking) finishes the job as failed. Returning
    /// `Ok` without having reported completion leaves the job running until
    /// the engine calls `done` or `acknowledge_cancel` later.
    async fn start(&self, ctx: JobContext) -> std::result::Result<(), EngineError>;
}

/// Everything an engine gets for one dispatched job.
pub struct JobContext {
    /// The job as it was at dispatch time.
    pub job: Job,
    /// Cancelled when a caller asks the job to stop.
    pub cancel: CancellationToken,
    pub reporter: JobReporter,
}

/// Callback handle bound to one running job.
#[derive(Clone)]
pub struct JobReporter {
    scheduler: Scheduler,
    job_id: JobId,
}

impl JobReporter {
    pub(crate) fn new(scheduler: Scheduler, job_id: JobId) -> Self {
        Self { scheduler, job_id }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn progress(&self, result: StepResult) -> Result<()> {
        self.scheduler.report_progress(self.job_id, result)
    }

    pub fn done(&self, outcome: std::result::Result<(), EngineError>) -> Result<()> {
        self.scheduler.report_done(self.job_id, outcome)
    }

    pub fn acknowledge_cancel(&self) -> Result<()> {
        self.scheduler.acknowledge_cancel(self.job_id)
    }
}

impl std::fmt::Debug for JobReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobReporter").field("job_id", &self.job_id).finish()
    }
}

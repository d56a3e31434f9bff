use std::sync::Arc;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{JobContext, JobReporter};
use crate::error::{EngineError, Result, SchedulerError};
use crate::job::{JobId, JobOutcome};
use crate::journal::StepResult;

use super::core::{ControlState, RunningJob};
use super::Scheduler;

impl Scheduler {
    /// Spawn the dispatch loop on the current Tokio runtime.
    ///
    /// The loop sleeps until woken by a submission, `run()`, a job leaving
    /// the running set, or the idle tick, and exits on [`Scheduler::shutdown`].
    pub fn spawn_dispatcher(&self) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.dispatch_loop().await })
    }

    async fn dispatch_loop(&self) {
        let tick = self.inner.config.idle_tick();
        let shutdown = self.inner.shutdown.clone();
        info!(
            engine = self.inner.engine.name(),
            slots = self.inner.config.dispatch_slots,
            "dispatcher started"
        );

        loop {
            self.dispatch_pending();

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.inner.wakeup.notified() => {}
                _ = tokio::time::sleep(tick) => {}
            }
        }

        info!("dispatcher stopped");
    }

    /// One dispatch pass: while running and a slot is free, move the queue
    /// head into the running set and hand it to the engine. Returns the
    /// number of jobs dispatched.
    ///
    /// Does nothing outside a Tokio runtime, since engines run as tasks.
    pub fn dispatch_pending(&self) -> usize {
        let Ok(runtime) = Handle::try_current() else {
            warn!("dispatch attempted outside a Tokio runtime");
            return 0;
        };

        let mut launched = Vec::new();
        {
            let mut reg = self.lock();
            while reg.control == ControlState::Running
                && self.inner.config.has_free_slot(reg.running.len())
            {
                let Some(mut job) = reg.queue.pop_front() else {
                    break;
                };
                let now = Utc::now();
                job.mark_started(now);
                reg.metrics.dispatched += 1;
                reg.metrics.last_dispatch = Some(now);

                let cancel = CancellationToken::new();
                launched.push(JobContext {
                    job: job.clone(),
                    cancel: cancel.clone(),
                    reporter: JobReporter::new(self.clone(), job.id),
                });
                reg.running.insert(
                    job.id,
                    RunningJob {
                        job,
                        cancel,
                        settled: CancellationToken::new(),
                        runtime: runtime.clone(),
                    },
                );
            }
        }

        let count = launched.len();
        for ctx in launched {
            info!(job_id = ctx.job.id, cluster = %ctx.job.cluster, name = %ctx.job.name, "job dispatched");
            self.launch(&runtime, ctx);
        }
        count
    }

    /// Run the engine for one job. Any engine error or panic is absorbed
    /// here and turned into a failed job.
    fn launch(&self, runtime: &Handle, ctx: JobContext) {
        let engine = Arc::clone(&self.inner.engine);
        let scheduler = self.clone();
        let id = ctx.job.id;

        runtime.spawn(async move {
            let execution = tokio::spawn(async move { engine.start(ctx).await });
            let fault = match execution.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(join) => Some(EngineError::Panicked(join.to_string())),
            };
            if let Some(e) = fault {
                scheduler.absorb_engine_fault(id, e);
            }
        });
    }

    fn absorb_engine_fault(&self, id: JobId, error: EngineError) {
        let message = error.to_string();
        let mut reg = self.lock();
        let outcome = JobOutcome::Failed {
            error: message.clone(),
        };
        if reg.finish_running(id, outcome, Some(message.clone())).is_some() {
            drop(reg);
            warn!(job_id = id, error = %message, "job failed in engine");
            self.inner.wakeup.notify_one();
        } else {
            debug!(job_id = id, error = %message, "engine fault after job left the running set");
        }
    }

    // ── Engine callbacks ────────────────────────────────────────

    /// Record a step result for a running job.
    pub fn report_progress(&self, id: JobId, result: StepResult) -> Result<()> {
        let mut reg = self.lock();
        let Some(entry) = reg.running.get_mut(&id) else {
            return Err(reg.state_error(id, "report progress"));
        };
        let step = result.step.clone();
        if entry.job.journal.record(result, Utc::now())? {
            debug!(job_id = id, step = %step, progress = entry.job.progress(), "step recorded");
        }
        Ok(())
    }

    /// The engine finished a job, successfully or not.
    pub fn report_done(&self, id: JobId, outcome: std::result::Result<(), EngineError>) -> Result<()> {
        let (outcome, note) = match outcome {
            Ok(()) => (JobOutcome::Succeeded, None),
            Err(e) => (
                JobOutcome::Failed { error: e.to_string() },
                Some(e.to_string()),
            ),
        };

        let mut reg = self.lock();
        if !reg.running.contains_key(&id) {
            return Err(reg.state_error(id, "report done"));
        }
        let failed = note.is_some();
        reg.finish_running(id, outcome, note);
        drop(reg);

        if failed {
            warn!(job_id = id, "job finished with failure");
        } else {
            info!(job_id = id, "job completed");
        }
        self.inner.wakeup.notify_one();
        Ok(())
    }

    /// The engine stopped a job after a cancel request.
    pub fn acknowledge_cancel(&self, id: JobId) -> Result<()> {
        let mut reg = self.lock();
        let pending = match reg.running.get(&id) {
            Some(r) => r.job.cancel_requested.is_some(),
            None => return Err(reg.state_error(id, "acknowledge cancel")),
        };
        if !pending {
            return Err(SchedulerError::BadRequest(format!(
                "no cancel request pending for job {}",
                id
            )));
        }
        reg.finish_running(id, JobOutcome::Canceled, Some("engine acknowledged cancellation".to_string()));
        drop(reg);

        info!(job_id = id, "job canceled");
        self.inner.wakeup.notify_one();
        Ok(())
    }
}

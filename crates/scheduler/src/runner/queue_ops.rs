use chrono::Utc;
use docsched_core::UserId;
use tracing::{info, warn};

use crate::auth::AccessLevel;
use crate::error::{Result, SchedulerError};
use crate::job::{JobId, JobOutcome, JobState};

use super::Scheduler;

impl Scheduler {
    /// Cancel a job.
    ///
    /// A queued job goes straight to the done set. For a running job this
    /// only records the request and signals the engine; the job finishes
    /// once the engine acknowledges or `cancel_timeout` elapses.
    pub fn cancel(&self, caller: &UserId, id: JobId) -> Result<()> {
        let principal = self.inner.authorizer.principal(caller);
        let mut reg = self.lock();

        let job = reg.find(id).ok_or(SchedulerError::NotFound(id))?;
        self.inner
            .authorizer
            .require(&principal, &job.cluster, AccessLevel::Write)?;
        let state = job.state;

        match state {
            JobState::Done => Err(reg.state_error(id, "cancel")),
            JobState::Scheduled => {
                let Some(mut job) = reg.queue.remove(id) else {
                    return Err(reg.state_error(id, "cancel"));
                };
                let now = Utc::now();
                job.journal.note(now, format!("canceled by {} before start", caller));
                reg.metrics.record_outcome(&JobOutcome::Canceled);
                job.finish(JobOutcome::Canceled, now);
                reg.done.insert(id, job);
                info!(job_id = id, user = %caller, "queued job canceled");
                Ok(())
            }
            JobState::Running => {
                let timeout = self.inner.config.cancel_timeout();
                let Some(entry) = reg.running.get_mut(&id) else {
                    return Err(reg.state_error(id, "cancel"));
                };
                if entry.job.cancel_requested.is_some() {
                    // Already pending; the first request's timer still applies.
                    return Ok(());
                }

                let now = Utc::now();
                entry.job.cancel_requested = Some(now);
                entry.job.journal.note(now, format!("cancel requested by {}", caller));
                entry.cancel.cancel();

                let scheduler = self.clone();
                let settled = entry.settled.clone();
                let shutdown = self.inner.shutdown.clone();
                entry.runtime.spawn(async move {
                    tokio::select! {
                        _ = tokio::time::sleep(timeout) => scheduler.force_cancel(id),
                        _ = settled.cancelled() => {}
                        _ = shutdown.cancelled() => {}
                    }
                });
                info!(job_id = id, user = %caller, timeout_ms = timeout.as_millis() as u64, "cancel requested for running job");
                Ok(())
            }
        }
    }

    /// Finish a running job whose cancel was never acknowledged.
    pub(super) fn force_cancel(&self, id: JobId) {
        let timeout_ms = self.inner.config.cancel_timeout_ms;
        let mut reg = self.lock();
        let pending = reg
            .running
            .get(&id)
            .is_some_and(|r| r.job.cancel_requested.is_some());
        if !pending {
            return;
        }

        let note = format!("engine did not acknowledge cancellation within {}ms; forced", timeout_ms);
        if reg.finish_running(id, JobOutcome::Canceled, Some(note)).is_some() {
            reg.metrics.forced_cancels += 1;
            drop(reg);
            warn!(job_id = id, timeout_ms, "cancellation forced after timeout");
            self.inner.wakeup.notify_one();
        }
    }

    /// Move a queued job to the head of the queue. Coordinator only.
    pub fn reschedule_begin(&self, caller: &UserId, id: JobId) -> Result<()> {
        self.reschedule(caller, id, true)
    }

    /// Move a queued job to the tail of the queue. Coordinator only.
    pub fn reschedule_end(&self, caller: &UserId, id: JobId) -> Result<()> {
        self.reschedule(caller, id, false)
    }

    fn reschedule(&self, caller: &UserId, id: JobId, to_front: bool) -> Result<()> {
        let principal = self.inner.authorizer.principal(caller);
        self.inner.authorizer.require_coordinator(&principal)?;

        let operation = if to_front { "reschedule to front" } else { "reschedule to end" };
        let mut reg = self.lock();
        let moved = if to_front {
            reg.queue.move_to_front(id)
        } else {
            reg.queue.move_to_back(id)
        };
        if !moved {
            return Err(reg.state_error(id, operation));
        }
        info!(job_id = id, user = %caller, to_front, "job rescheduled");
        Ok(())
    }

    /// Exchange the queue positions of two scheduled jobs.
    ///
    /// Needs coordinator rights or admin access on both jobs' clusters.
    pub fn swap(&self, caller: &UserId, a: JobId, b: JobId) -> Result<()> {
        let principal = self.inner.authorizer.principal(caller);
        let mut reg = self.lock();

        let cluster_a = reg
            .queue
            .get(a)
            .map(|j| j.cluster.clone())
            .ok_or_else(|| SchedulerError::BadRequest(format!("job {} is not scheduled", a)))?;
        let cluster_b = reg
            .queue
            .get(b)
            .map(|j| j.cluster.clone())
            .ok_or_else(|| SchedulerError::BadRequest(format!("job {} is not scheduled", b)))?;

        let auth = &self.inner.authorizer;
        auth.require(&principal, &cluster_a, AccessLevel::Admin)?;
        auth.require(&principal, &cluster_b, AccessLevel::Admin)?;

        if a != b {
            reg.queue.swap(a, b);
            info!(a, b, user = %caller, "jobs swapped");
        }
        Ok(())
    }
}

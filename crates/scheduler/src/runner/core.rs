use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use docsched_core::{ClusterRef, SchedulerConfig, UserId};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::{AccessLevel, Authorizer};
use crate::engine::ExecutionEngine;
use crate::error::{Result, SchedulerError};
use crate::job::{Job, JobId, JobOutcome, JobState, NewJob};
use crate::metrics::{SchedulerMetrics, SchedulerStatus};
use crate::queue::JobQueue;
use crate::view::{self, Container, Inclusion, SnapshotQuery};

/// Global dispatch switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    Running,
    /// No new dispatch; in-flight jobs continue.
    Paused,
}

pub(super) struct RunningJob {
    pub job: Job,
    pub cancel: CancellationToken,
    /// Cancelled once the job leaves the running set; stops its cancel timer.
    pub settled: CancellationToken,
    /// Runtime the job was dispatched on; cancel timers are armed here.
    pub runtime: Handle,
}

/// Everything guarded by the scheduler's single lock.
///
/// A job is owned by exactly one of `queue`, `running` or `done`; moving it
/// between them is a move of the value.
pub(super) struct Registry {
    pub queue: JobQueue,
    pub running: HashMap<JobId, RunningJob>,
    pub done: HashMap<JobId, Job>,
    pub control: ControlState,
    pub start: Option<DateTime<Utc>>,
    pub state_updated: DateTime<Utc>,
    pub next_id: JobId,
    pub metrics: SchedulerMetrics,
}

impl Registry {
    fn new(control: ControlState, now: DateTime<Utc>) -> Self {
        Self {
            queue: JobQueue::new(),
            running: HashMap::new(),
            done: HashMap::new(),
            control,
            start: (control == ControlState::Running).then_some(now),
            state_updated: now,
            next_id: 1,
            metrics: SchedulerMetrics::default(),
        }
    }

    pub fn find(&self, id: JobId) -> Option<&Job> {
        self.queue
            .get(id)
            .or_else(|| self.running.get(&id).map(|r| &r.job))
            .or_else(|| self.done.get(&id))
    }

    /// Switch the control state. Returns false when already in `control`.
    pub fn set_control(&mut self, control: ControlState, now: DateTime<Utc>) -> bool {
        if self.control == control {
            return false;
        }
        self.control = control;
        self.state_updated = now;
        if control == ControlState::Running && self.start.is_none() {
            self.start = Some(now);
        }
        true
    }

    /// Move a running job into the done set. Returns `None` if it was not running.
    pub fn finish_running(&mut self, id: JobId, outcome: JobOutcome, note: Option<String>) -> Option<&Job> {
        let RunningJob { mut job, settled, .. } = self.running.remove(&id)?;
        settled.cancel();
        let now = Utc::now();
        if let Some(note) = note {
            job.journal.note(now, note);
        }
        self.metrics.record_outcome(&outcome);
        job.finish(outcome, now);
        self.done.insert(id, job);
        self.done.get(&id)
    }

    /// Error for an operation the job's current state does not allow.
    pub fn state_error(&self, id: JobId, operation: &'static str) -> SchedulerError {
        match self.find(id) {
            Some(job) => SchedulerError::InvalidState {
                id,
                state: job.state,
                operation,
            },
            None => SchedulerError::NotFound(id),
        }
    }
}

pub(super) struct Inner {
    pub config: SchedulerConfig,
    pub registry: Mutex<Registry>,
    pub engine: Arc<dyn ExecutionEngine>,
    pub authorizer: Authorizer,
    /// Wakes the dispatch loop (new job, `run()`, a slot freed).
    pub wakeup: Notify,
    pub shutdown: CancellationToken,
}

/// Handle to one scheduler instance. Cloning is cheap and every clone
/// refers to the same queue and job sets.
#[derive(Clone)]
pub struct Scheduler {
    pub(super) inner: Arc<Inner>,
}

impl Scheduler {
    /// Create a scheduler. It starts paused when `config.start_paused` is set,
    /// running otherwise; the dispatch loop is started separately with
    /// [`Scheduler::spawn_dispatcher`].
    pub fn new(config: SchedulerConfig, engine: Arc<dyn ExecutionEngine>, authorizer: Authorizer) -> Self {
        let control = if config.start_paused {
            ControlState::Paused
        } else {
            ControlState::Running
        };
        info!(
            engine = engine.name(),
            slots = config.dispatch_slots,
            control = ?control,
            "scheduler created"
        );
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::new(control, Utc::now())),
                config,
                engine,
                authorizer,
                wakeup: Notify::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// A panicking caller must not take the scheduler down with it, so a
    /// poisoned lock is recovered rather than propagated.
    pub(super) fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    // ── Producer ────────────────────────────────────────────────

    /// Enqueue a job at the tail of the queue and return its id.
    pub fn submit(&self, new: NewJob) -> Result<JobId> {
        let mut names = std::collections::HashSet::new();
        if let Some(dup) = new.plan.iter().find(|s| !names.insert(s.name.as_str())) {
            return Err(SchedulerError::BadRequest(format!("duplicate step '{}' in plan", dup.name)));
        }

        let id = {
            let mut reg = self.lock();
            let id = reg.next_id;
            reg.next_id += 1;
            let job = Job::from_new(id, new, Utc::now());
            debug!(job_id = id, cluster = %job.cluster, owner = %job.owner, name = %job.name, "job submitted");
            reg.queue.push_back(job);
            reg.metrics.submitted += 1;
            id
        };
        self.inner.wakeup.notify_one();
        Ok(id)
    }

    // ── Reads ───────────────────────────────────────────────────

    /// Jobs visible to `caller`: every cluster they can read, widened by
    /// `extra`. Inclusions are narrowed to the caller's own rights first.
    pub fn snapshot(&self, caller: &UserId, extra: Vec<Inclusion>) -> Container {
        let auth = &self.inner.authorizer;
        let principal = auth.principal(caller);
        let query = SnapshotQuery {
            scope: auth.scope(&principal, AccessLevel::Read),
            extra: extra
                .into_iter()
                .filter_map(|inclusion| auth.restrict(&principal, inclusion))
                .collect(),
        };
        self.snapshot_with(&query)
    }

    /// Snapshot for an already-resolved query (no authorization applied).
    pub fn snapshot_with(&self, query: &SnapshotQuery) -> Container {
        let reg = self.lock();
        view::build(
            query,
            reg.queue.iter(),
            reg.running.values().map(|r| &r.job),
            reg.done.values(),
        )
    }

    /// One job, if `caller` may read its cluster or owns it.
    pub fn job(&self, caller: &UserId, id: JobId) -> Result<Job> {
        let principal = self.inner.authorizer.principal(caller);
        let reg = self.lock();
        let job = reg.find(id).ok_or(SchedulerError::NotFound(id))?;
        if &job.owner != caller {
            self.inner.authorizer.require(&principal, &job.cluster, AccessLevel::Read)?;
        }
        Ok(job.clone())
    }

    /// Whether the job exists and belongs to one of `clusters`.
    pub fn is_target(&self, id: JobId, clusters: &[ClusterRef]) -> bool {
        self.lock()
            .find(id)
            .map(|job| view::is_target(job, clusters))
            .unwrap_or(false)
    }

    pub fn state_of(&self, id: JobId) -> Option<JobState> {
        self.lock().find(id).map(|j| j.state)
    }

    pub fn is_running(&self) -> bool {
        self.lock().control == ControlState::Running
    }

    pub fn control_state(&self) -> ControlState {
        self.lock().control
    }

    /// When the scheduler first entered the running state.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.lock().start
    }

    /// Time of the last effective run/pause transition.
    pub fn state_updated(&self) -> DateTime<Utc> {
        self.lock().state_updated
    }

    pub fn status(&self) -> SchedulerStatus {
        let reg = self.lock();
        SchedulerStatus {
            running: reg.control == ControlState::Running,
            start: reg.start,
            state_updated: reg.state_updated,
            scheduled: reg.queue.len(),
            active: reg.running.len(),
            done: reg.done.len(),
        }
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        self.lock().metrics.clone()
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Stop the dispatch loop and drop pending cancel timers. Running jobs
    /// are left to finish.
    pub fn shutdown(&self) {
        info!("Scheduler shutdown requested");
        self.inner.shutdown.cancel();
    }

    pub fn shutdown_signal(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use docsched_core::{ClusterRef, UserId};
use serde::{Deserialize, Serialize};

use crate::journal::{Journal, PlannedStep};

/// Scheduler-assigned job identifier, monotonically increasing from 1.
pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Scheduled,
    Running,
    /// Terminal. "No longer active", whatever the outcome.
    Done,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Scheduled => write!(f, "scheduled"),
            JobState::Running => write!(f, "running"),
            JobState::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed { error: String },
    Canceled,
}

/// What a producer hands to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub cluster: ClusterRef,
    pub owner: UserId,
    pub name: String,
    pub plan: Vec<PlannedStep>,
}

impl NewJob {
    pub fn new(cluster: ClusterRef, owner: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            cluster,
            owner: owner.into(),
            name: name.into(),
            plan: Vec::new(),
        }
    }

    pub fn step(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.plan.push(PlannedStep::new(name, weight));
        self
    }
}

/// A unit of scheduled work.
///
/// Callers only ever see clones; `state`, the timestamps and the journal are
/// changed exclusively by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub cluster: ClusterRef,
    pub owner: UserId,
    pub name: String,
    pub state: JobState,
    pub outcome: Option<JobOutcome>,
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub ended: Option<DateTime<Utc>>,
    /// When a cancel request was accepted for this job while it was running.
    pub cancel_requested: Option<DateTime<Utc>>,
    pub journal: Journal,
}

impl Job {
    pub(crate) fn from_new(id: JobId, new: NewJob, created: DateTime<Utc>) -> Self {
        Self {
            id,
            cluster: new.cluster,
            owner: new.owner,
            name: new.name,
            state: JobState::Scheduled,
            outcome: None,
            created,
            started: None,
            ended: None,
            cancel_requested: None,
            journal: Journal::from_plan(new.plan),
        }
    }

    /// Aggregate completion fraction in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.journal.total_weight() <= 0.0 {
            return if self.outcome == Some(JobOutcome::Succeeded) { 1.0 } else { 0.0 };
        }
        self.journal.progress()
    }

    pub fn is_canceled(&self) -> bool {
        self.outcome == Some(JobOutcome::Canceled)
    }

    pub(crate) fn mark_started(&mut self, at: DateTime<Utc>) {
        debug_assert_eq!(self.state, JobState::Scheduled);
        self.state = JobState::Running;
        self.started = Some(at);
    }

    /// Move to the terminal state. A job that never ran gets `started == ended`.
    pub(crate) fn finish(&mut self, outcome: JobOutcome, at: DateTime<Utc>) {
        if self.started.is_none() {
            self.started = Some(at);
        }
        self.state = JobState::Done;
        self.outcome = Some(outcome);
        self.ended = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job() -> Job {
        let new = NewJob::new(ClusterRef::project("p1"), "alice", "ocr")
            .step("layout", 1.0)
            .step("text", 3.0);
        Job::from_new(7, new, Utc::now())
    }

    #[test]
    fn new_jobs_are_scheduled() {
        let job = new_job();
        assert_eq!(job.id, 7);
        assert_eq!(job.state, JobState::Scheduled);
        assert!(job.started.is_none());
        assert!(job.ended.is_none());
        assert_eq!(job.journal.steps.len(), 2);
    }

    #[test]
    fn canceling_a_queued_job_stamps_both_times() {
        let mut job = new_job();
        let at = Utc::now();
        job.finish(JobOutcome::Canceled, at);

        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.started, Some(at));
        assert_eq!(job.ended, Some(at));
        assert!(job.is_canceled());
    }

    #[test]
    fn finishing_keeps_start_time() {
        let mut job = new_job();
        let started = Utc::now();
        job.mark_started(started);
        job.finish(JobOutcome::Succeeded, started + chrono::Duration::seconds(5));

        assert_eq!(job.started, Some(started));
        assert!(job.ended > job.started);
    }

    #[test]
    fn weightless_job_progress_follows_outcome() {
        let mut job = Job::from_new(1, NewJob::new(ClusterRef::project("p"), "bob", "noop"), Utc::now());
        assert_eq!(job.progress(), 0.0);
        job.finish(JobOutcome::Succeeded, Utc::now());
        assert_eq!(job.progress(), 1.0);
    }

    #[test]
    fn state_display() {
        assert_eq!(JobState::Scheduled.to_string(), "scheduled");
        assert_eq!(JobState::Done.to_string(), "done");
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::job::JobOutcome;

/// Lifetime counters of one scheduler instance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    pub submitted: u64,
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub canceled: u64,
    /// Cancels that completed because the engine never acknowledged in time.
    pub forced_cancels: u64,
    pub expunged: u64,
    pub last_dispatch: Option<DateTime<Utc>>,
}

impl SchedulerMetrics {
    pub fn record_outcome(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Succeeded => self.succeeded += 1,
            JobOutcome::Failed { .. } => self.failed += 1,
            JobOutcome::Canceled => self.canceled += 1,
        }
    }

    pub fn finished(&self) -> u64 {
        self.succeeded + self.failed + self.canceled
    }
}

/// Control state and collection sizes, for health endpoints and logs.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub start: Option<DateTime<Utc>>,
    pub state_updated: DateTime<Utc>,
    pub scheduled: usize,
    pub active: usize,
    pub done: usize,
}

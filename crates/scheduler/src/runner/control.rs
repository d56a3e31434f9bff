use chrono::Utc;
use docsched_core::UserId;
use tracing::info;

use crate::error::Result;

use super::core::ControlState;
use super::Scheduler;

impl Scheduler {
    /// Resume dispatching. Calling it while already running changes nothing,
    /// `state_updated` included.
    pub fn run(&self, caller: &UserId) -> Result<()> {
        let principal = self.inner.authorizer.principal(caller);
        self.inner.authorizer.require_coordinator(&principal)?;

        let changed = self.lock().set_control(ControlState::Running, Utc::now());
        if changed {
            info!(user = %caller, "scheduler running");
            self.inner.wakeup.notify_one();
        }
        Ok(())
    }

    /// Stop dispatching new jobs. Running jobs continue to completion.
    pub fn pause(&self, caller: &UserId) -> Result<()> {
        let principal = self.inner.authorizer.principal(caller);
        self.inner.authorizer.require_coordinator(&principal)?;

        if self.lock().set_control(ControlState::Paused, Utc::now()) {
            info!(user = %caller, "scheduler paused");
        }
        Ok(())
    }

    /// Drop every finished job. Returns how many were removed.
    pub fn expunge_done(&self, caller: &UserId) -> Result<usize> {
        let principal = self.inner.authorizer.principal(caller);
        self.inner.authorizer.require_coordinator(&principal)?;

        let mut reg = self.lock();
        let removed = reg.done.len();
        reg.done.clear();
        reg.metrics.expunged += removed as u64;
        drop(reg);

        info!(user = %caller, removed, "done jobs expunged");
        Ok(removed)
    }
}

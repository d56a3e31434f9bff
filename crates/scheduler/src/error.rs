//! Scheduler error types.

use thiserror::Error;

use crate::job::{JobId, JobState};

/// Errors returned synchronously to the caller of a scheduler operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("job {id} is {state}, cannot {operation}")]
    InvalidState {
        id: JobId,
        state: JobState,
        operation: &'static str,
    },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Faults raised by an execution engine while a job runs.
///
/// These never reach the mutation caller: the scheduler records them in the
/// job's journal and finishes the job with a failed outcome.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("engine fault: {0}")]
    Fault(String),

    #[error("execution panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

//! Job scheduler core for the document-processing platform.
//!
//! Tracks every unit of asynchronous work (pipeline runs, model training)
//! across all projects: a FIFO queue of scheduled jobs with explicit
//! reordering, the running and done sets, a global run/pause switch, and
//! authorization-scoped snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docsched_core::{ClusterRef, SchedulerConfig, SimulationConfig};
//! use docsched_scheduler::{AccessLevel, Authorizer, NewJob, Scheduler, SimulatedEngine, StaticRights};
//!
//! # async fn demo() -> Result<(), docsched_scheduler::SchedulerError> {
//! let rights = StaticRights::new()
//!     .coordinator("admin")
//!     .grant("alice", ClusterRef::project("42"), AccessLevel::Write);
//! let scheduler = Scheduler::new(
//!     SchedulerConfig::default(),
//!     Arc::new(SimulatedEngine::new(SimulationConfig::default())),
//!     Authorizer::new(Arc::new(rights)),
//! );
//! let dispatcher = scheduler.spawn_dispatcher();
//!
//! let id = scheduler.submit(
//!     NewJob::new(ClusterRef::project("42"), "alice", "ocr")
//!         .step("layout", 1.0)
//!         .step("recognize", 3.0),
//! )?;
//! let view = scheduler.snapshot(&"alice".into(), Vec::new());
//! println!("job {} visible: {}", id, !view.is_empty());
//!
//! scheduler.shutdown();
//! let _ = dispatcher.await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod engine;
pub mod error;
pub mod job;
pub mod journal;
pub mod metrics;
pub mod queue;
pub mod runner;
pub mod simulated;
pub mod view;

pub use auth::{AccessLevel, Authorizer, Principal, RightsLookup, StaticRights};
pub use engine::{ExecutionEngine, JobContext, JobReporter};
pub use error::{EngineError, SchedulerError};
pub use job::{Job, JobId, JobOutcome, JobState, NewJob};
pub use journal::{Journal, JournalEntry, JournalStep, PlannedStep, StepOutcome, StepResult, StepStatus};
pub use metrics::{SchedulerMetrics, SchedulerStatus};
pub use queue::JobQueue;
pub use runner::{ControlState, Scheduler};
pub use simulated::SimulatedEngine;
pub use view::{Container, Inclusion, Scope, SnapshotQuery};

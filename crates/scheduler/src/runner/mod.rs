//! Scheduler runner -- owns the queue, the running and done sets, and the
//! run/pause control state.
//!
//! Split into focused submodules:
//! - `core`: Scheduler handle, registry, construction, submission and reads
//! - `control`: run / pause / expunge
//! - `queue_ops`: cancel and queue reordering
//! - `dispatch`: the dispatch loop and engine callbacks

mod control;
mod core;
mod dispatch;
mod queue_ops;

pub use self::core::{ControlState, Scheduler};

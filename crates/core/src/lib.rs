pub mod cluster;
pub mod config;
pub mod error;

pub use cluster::*;
pub use config::{Config, SchedulerConfig, SimulationConfig};
pub use error::*;

//! Demo engine that pretends to run each declared step.

use async_trait::async_trait;
use docsched_core::SimulationConfig;
use rand::Rng;
use tracing::{debug, info};

use crate::engine::{ExecutionEngine, JobContext};
use crate::error::EngineError;
use crate::journal::StepResult;

/// Walks a job's journal plan, sleeping `step_delay` per step.
///
/// Honors cancellation between steps and fails a step with probability
/// `failure_rate`.
pub struct SimulatedEngine {
    config: SimulationConfig,
}

impl SimulatedEngine {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ExecutionEngine for SimulatedEngine {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn start(&self, ctx: JobContext) -> Result<(), EngineError> {
        let JobContext { job, cancel, reporter } = ctx;
        let steps: Vec<String> = job.journal.steps.iter().map(|s| s.name.clone()).collect();

        for step in steps {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(job_id = job.id, step = %step, "simulation stopping on cancel");
                    reporter
                        .acknowledge_cancel()
                        .map_err(|e| EngineError::Fault(e.to_string()))?;
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.step_delay()) => {}
            }

            let failed = self.config.failure_rate > 0.0
                && rand::thread_rng().gen_bool(self.config.failure_rate);
            if failed {
                let msg = format!("simulated failure in step '{}'", step);
                // The step failure goes to the journal; the fault itself is
                // returned so the scheduler records the failed outcome.
                if let Err(e) = reporter.progress(StepResult::failed(&step, &msg)) {
                    debug!(job_id = job.id, step = %step, error = %e, "failed step not recorded");
                }
                return Err(EngineError::Fault(msg));
            }

            debug!(job_id = job.id, step = %step, "simulated step complete");
            reporter
                .progress(StepResult::completed(&step))
                .map_err(|e| EngineError::Fault(e.to_string()))?;
        }

        reporter
            .done(Ok(()))
            .map_err(|e| EngineError::Fault(e.to_string()))
    }
}

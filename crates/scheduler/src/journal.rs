//! Progress journal: the declared step plan of a job and what happened to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// A step declared by the producer when the job is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub name: String,
    /// Relative share of the job's total work. Negative weights are treated as 0.
    pub weight: f64,
}

impl PlannedStep {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Completed,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalStep {
    pub name: String,
    pub weight: f64,
    pub status: StepStatus,
    pub finished: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

impl JournalStep {
    pub fn is_finished(&self) -> bool {
        !matches!(self.status, StepStatus::Pending)
    }
}

/// Free-text, timestamped note (engine faults, cancellation events).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// What the engine reports for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub outcome: StepOutcome,
    pub message: Option<String>,
}

impl StepResult {
    pub fn completed(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            outcome: StepOutcome::Completed,
            message: None,
        }
    }

    pub fn failed(step: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            outcome: StepOutcome::Failed(error.into()),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub steps: Vec<JournalStep>,
    pub entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn from_plan(plan: Vec<PlannedStep>) -> Self {
        let steps = plan
            .into_iter()
            .map(|s| JournalStep {
                name: s.name,
                weight: if s.weight.is_finite() { s.weight.max(0.0) } else { 0.0 },
                status: StepStatus::Pending,
                finished: None,
                message: None,
            })
            .collect();
        Self {
            steps,
            entries: Vec::new(),
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.steps.iter().map(|s| s.weight).sum()
    }

    /// Completed weight over total weight, clamped to [0, 1].
    /// A plan without weight has no measurable progress.
    pub fn progress(&self) -> f64 {
        let total = self.total_weight();
        if total <= 0.0 {
            return 0.0;
        }
        let done: f64 = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .map(|s| s.weight)
            .sum();
        (done / total).clamp(0.0, 1.0)
    }

    /// Apply an engine step report. Finished steps are never rewritten, so
    /// progress cannot go backwards. Returns whether the journal changed.
    pub fn record(&mut self, result: StepResult, at: DateTime<Utc>) -> Result<bool> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.name == result.step)
            .ok_or_else(|| SchedulerError::BadRequest(format!("undeclared step '{}'", result.step)))?;

        if step.is_finished() {
            return Ok(false);
        }

        step.status = match result.outcome {
            StepOutcome::Completed => StepStatus::Completed,
            StepOutcome::Failed(error) => StepStatus::Failed { error },
        };
        step.finished = Some(at);
        step.message = result.message;
        Ok(true)
    }

    pub fn note(&mut self, at: DateTime<Utc>, message: impl Into<String>) {
        self.entries.push(JournalEntry {
            at,
            message: message.into(),
        });
    }
}

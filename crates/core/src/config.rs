use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub scheduler: SchedulerConfig,
    pub simulation: SimulationConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DOCSCHED_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DOCSCHED_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            scheduler: SchedulerConfig::from_env_profiled(p),
            simulation: SimulationConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  scheduler:   slots={}, cancel_timeout={}ms, idle_tick={}ms, start_paused={}",
            self.scheduler.dispatch_slots,
            self.scheduler.cancel_timeout_ms,
            self.scheduler.idle_tick_ms,
            self.scheduler.start_paused
        );
        tracing::info!(
            "  simulation:  step_delay={}ms, failure_rate={}",
            self.simulation.step_delay_ms,
            self.simulation.failure_rate
        );
    }

    /// Return a JSON view of the resolved settings.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "scheduler": self.scheduler,
            "simulation": self.simulation,
        })
    }
}

// ── Scheduler ─────────────────────────────────────────────────

/// Scheduler tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of concurrently running jobs. 0 = unbounded.
    #[serde(default = "default_dispatch_slots")]
    pub dispatch_slots: usize,
    /// How long a running job may ignore a cancel request before it is
    /// forced into the done set.
    #[serde(default = "default_cancel_timeout")]
    pub cancel_timeout_ms: u64,
    /// Dispatch loop re-check interval when nothing wakes it.
    #[serde(default = "default_idle_tick")]
    pub idle_tick_ms: u64,
    /// Construct the scheduler in the paused control state.
    #[serde(default)]
    pub start_paused: bool,
}

fn default_dispatch_slots() -> usize { 1 }
fn default_cancel_timeout() -> u64 { 30_000 }
fn default_idle_tick() -> u64 { 1_000 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            dispatch_slots: default_dispatch_slots(),
            cancel_timeout_ms: default_cancel_timeout(),
            idle_tick_ms: default_idle_tick(),
            start_paused: false,
        }
    }
}

impl SchedulerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            dispatch_slots: profiled_env_parse(p, "SCHEDULER_DISPATCH_SLOTS", default_dispatch_slots()),
            cancel_timeout_ms: profiled_env_parse(p, "SCHEDULER_CANCEL_TIMEOUT_MS", default_cancel_timeout()),
            idle_tick_ms: profiled_env_parse(p, "SCHEDULER_IDLE_TICK_MS", default_idle_tick()),
            start_paused: profiled_env_bool(p, "SCHEDULER_START_PAUSED", false),
        }
    }

    pub fn cancel_timeout(&self) -> Duration {
        Duration::from_millis(self.cancel_timeout_ms)
    }

    pub fn idle_tick(&self) -> Duration {
        Duration::from_millis(self.idle_tick_ms.max(1))
    }

    /// Whether another job may start while `running` jobs are active.
    pub fn has_free_slot(&self, running: usize) -> bool {
        self.dispatch_slots == 0 || running < self.dispatch_slots
    }
}

// ── Simulation engine ─────────────────────────────────────────

/// Settings for the demo execution engine shipped with the worker binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub step_delay_ms: u64,
    /// Probability (0.0 - 1.0) that a step fails.
    pub failure_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: 500,
            failure_rate: 0.0,
        }
    }
}

impl SimulationConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            step_delay_ms: profiled_env_parse(p, "SIM_STEP_DELAY_MS", 500),
            failure_rate: profiled_env_parse(p, "SIM_FAILURE_RATE", 0.0f64).clamp(0.0, 1.0),
        }
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

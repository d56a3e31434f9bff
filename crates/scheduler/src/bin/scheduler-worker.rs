//! scheduler-worker -- runs a job scheduler with the simulated engine.
//!
//! Submits a batch of demo jobs across a few clusters, then logs the
//! scheduler status every `--report-interval` seconds until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, warn};

use docsched_core::config::load_dotenv;
use docsched_core::{ClusterKind, ClusterRef, Config, UserId};
use docsched_scheduler::{
    AccessLevel, Authorizer, JobOutcome, NewJob, Scheduler, SimulatedEngine, StaticRights,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Job scheduler worker driving the simulated execution engine.
#[derive(Parser, Debug)]
#[command(name = "scheduler-worker", version, about)]
struct Cli {
    /// Override the number of dispatch slots (0 = unbounded).
    #[arg(long)]
    slots: Option<usize>,

    /// Override the cancel acknowledgement timeout in milliseconds.
    #[arg(long)]
    cancel_timeout_ms: Option<u64>,

    /// Start paused; the coordinator resumes after the first report.
    #[arg(long)]
    paused: bool,

    /// Number of demo jobs to submit at startup.
    #[arg(long, env = "SCHEDULER_WORKER_DEMO_JOBS", default_value_t = 6)]
    demo_jobs: usize,

    /// User holding scheduler coordinator rights.
    #[arg(long, env = "SCHEDULER_WORKER_COORDINATOR", default_value = "coordinator")]
    coordinator: String,

    /// Status report interval in seconds.
    #[arg(long, env = "SCHEDULER_WORKER_REPORT_INTERVAL", default_value_t = 5)]
    report_interval: u64,
}

// ── Demo workload ───────────────────────────────────────────────────

fn demo_clusters() -> [(ClusterRef, &'static str); 3] {
    [
        (ClusterRef::project("invoices"), "alice"),
        (ClusterRef::project("contracts"), "bob"),
        (ClusterRef::training_model("layout-v2"), "alice"),
    ]
}

fn demo_rights(coordinator: &str) -> StaticRights {
    demo_clusters()
        .into_iter()
        .fold(StaticRights::new().coordinator(coordinator), |rights, (cluster, owner)| {
            rights.grant(owner, cluster, AccessLevel::Admin)
        })
}

fn demo_job(n: usize) -> NewJob {
    let clusters = demo_clusters();
    let (cluster, owner) = clusters[n % clusters.len()].clone();
    match cluster.kind {
        ClusterKind::TrainingModel => NewJob::new(cluster, owner, format!("train-{}", n))
            .step("prepare", 1.0)
            .step("epoch-1", 3.0)
            .step("epoch-2", 3.0)
            .step("evaluate", 1.0),
        ClusterKind::Project => NewJob::new(cluster, owner, format!("ingest-{}", n))
            .step("split", 1.0)
            .step("ocr", 4.0)
            .step("extract", 2.0),
    }
}

fn report(scheduler: &Scheduler, coordinator: &UserId) {
    let status = scheduler.status();
    let metrics = scheduler.metrics();
    info!(
        running = status.running,
        scheduled = status.scheduled,
        active = status.active,
        done = status.done,
        succeeded = metrics.succeeded,
        failed = metrics.failed,
        canceled = metrics.canceled,
        "scheduler status"
    );

    let view = scheduler.snapshot(coordinator, Vec::new());
    for job in &view.running {
        info!(job_id = job.id, cluster = %job.cluster, progress_pct = (job.progress() * 100.0).round() as u64, "  running");
    }
    match serde_json::to_string(&view) {
        Ok(json) => debug!(snapshot = %json, "scheduler snapshot"),
        Err(e) => warn!(error = %e, "failed to serialize snapshot"),
    }
}

// ── Main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(slots) = cli.slots {
        config.scheduler.dispatch_slots = slots;
    }
    if let Some(timeout) = cli.cancel_timeout_ms {
        config.scheduler.cancel_timeout_ms = timeout;
    }
    config.scheduler.start_paused |= cli.paused;
    config.log_summary();

    let coordinator = UserId::from(cli.coordinator.as_str());
    let scheduler = Scheduler::new(
        config.scheduler.clone(),
        Arc::new(SimulatedEngine::new(config.simulation.clone())),
        Authorizer::new(Arc::new(demo_rights(&cli.coordinator))),
    );
    let dispatcher = scheduler.spawn_dispatcher();

    for n in 0..cli.demo_jobs {
        let id = scheduler.submit(demo_job(n))?;
        info!(job_id = id, "demo job submitted");
    }

    info!("scheduler-worker started");

    let mut ticker = tokio::time::interval(Duration::from_secs(cli.report_interval.max(1)));
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            _ = ticker.tick() => {
                report(&scheduler, &coordinator);
                if !scheduler.is_running() {
                    scheduler.run(&coordinator)?;
                }
            }
        }
    }

    scheduler.shutdown();
    if let Err(e) = dispatcher.await {
        warn!(error = %e, "dispatcher task ended abnormally");
    }

    let leftover = scheduler.snapshot(&coordinator, Vec::new());
    let succeeded = leftover
        .done
        .iter()
        .filter(|j| j.outcome == Some(JobOutcome::Succeeded))
        .count();
    info!(
        succeeded,
        done = leftover.done.len(),
        still_running = leftover.running.len(),
        still_scheduled = leftover.scheduled.len(),
        "scheduler-worker exited"
    );
    Ok(())
}

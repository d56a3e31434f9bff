//! End-to-end queue scenarios against a live dispatcher.
//!
//! The engine here never finishes on its own; tests complete jobs through
//! `report_done` so every transition is explicit.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use docsched_core::{ClusterRef, SchedulerConfig, UserId};
use docsched_scheduler::{
    AccessLevel, Authorizer, EngineError, ExecutionEngine, JobContext, JobId, JobState, NewJob,
    Scheduler, SchedulerError, SnapshotQuery, StaticRights,
};

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct HoldEngine {
    held: Mutex<HashMap<JobId, CancellationToken>>,
}

#[async_trait]
impl ExecutionEngine for HoldEngine {
    fn name(&self) -> &str {
        "hold"
    }

    async fn start(&self, ctx: JobContext) -> Result<(), EngineError> {
        self.held.lock().unwrap().insert(ctx.job.id, ctx.cancel);
        Ok(())
    }
}

fn coordinator() -> UserId {
    "ops".into()
}

fn scheduler(config: SchedulerConfig) -> Scheduler {
    let rights = StaticRights::new()
        .coordinator("ops")
        .grant("erin", ClusterRef::project("invoices"), AccessLevel::Admin);
    Scheduler::new(
        config,
        Arc::new(HoldEngine::default()),
        Authorizer::new(Arc::new(rights)),
    )
}

fn job(name: &str) -> NewJob {
    NewJob::new(ClusterRef::project("invoices"), "erin", name).step("extract", 1.0)
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    timeout(TIMEOUT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached before timeout");
}

/// Every id must appear in exactly one of the three collections.
fn assert_partition(s: &Scheduler, ids: &[JobId]) {
    let view = s.snapshot_with(&SnapshotQuery::all());
    let mut seen = HashSet::new();
    for id in view
        .scheduled_ids()
        .into_iter()
        .chain(view.running_ids())
        .chain(view.done_ids())
    {
        assert!(seen.insert(id), "job {} appears twice", id);
    }
    for id in ids {
        assert!(seen.contains(id), "job {} is missing", id);
    }
}

#[tokio::test]
async fn reorder_pause_and_cancel_walkthrough() {
    let s = scheduler(SchedulerConfig { idle_tick_ms: 20, ..Default::default() });
    let dispatcher = s.spawn_dispatcher();

    let j1 = s.submit(job("j1")).unwrap();
    let j2 = s.submit(job("j2")).unwrap();
    let j3 = s.submit(job("j3")).unwrap();
    wait_until(|| s.state_of(j1) == Some(JobState::Running)).await;

    let view = s.snapshot_with(&SnapshotQuery::all());
    assert_eq!(view.running_ids(), vec![j1]);
    assert_eq!(view.scheduled_ids(), vec![j2, j3]);

    s.swap(&coordinator(), j2, j3).unwrap();
    assert_eq!(s.snapshot_with(&SnapshotQuery::all()).scheduled_ids(), vec![j3, j2]);

    s.reschedule_end(&coordinator(), j3).unwrap();
    assert_eq!(s.snapshot_with(&SnapshotQuery::all()).scheduled_ids(), vec![j2, j3]);

    // Paused: the queue grows, the running set does not.
    s.pause(&coordinator()).unwrap();
    let j4 = s.submit(job("j4")).unwrap();
    s.report_done(j1, Ok(())).unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let view = s.snapshot_with(&SnapshotQuery::all());
    assert!(view.running_ids().is_empty());
    assert_eq!(view.scheduled_ids(), vec![j2, j3, j4]);
    assert_partition(&s, &[j1, j2, j3, j4]);

    s.run(&coordinator()).unwrap();
    wait_until(|| s.state_of(j2) == Some(JobState::Running)).await;
    assert_eq!(s.snapshot_with(&SnapshotQuery::all()).scheduled_ids(), vec![j3, j4]);

    // A queued job is canceled without ever running.
    s.cancel(&"erin".into(), j4).unwrap();
    let canceled = s.job(&"erin".into(), j4).unwrap();
    assert!(canceled.is_canceled());
    assert_eq!(canceled.started, canceled.ended);
    assert_partition(&s, &[j1, j2, j3, j4]);

    s.shutdown();
    dispatcher.await.unwrap();
}

#[tokio::test]
async fn reschedule_begin_then_snapshot_shows_head() {
    let s = scheduler(SchedulerConfig { start_paused: true, ..Default::default() });
    let ids: Vec<JobId> = (0..5).map(|i| s.submit(job(&format!("j{}", i))).unwrap()).collect();

    s.reschedule_begin(&coordinator(), ids[3]).unwrap();
    let order = s.snapshot_with(&SnapshotQuery::all()).scheduled_ids();
    assert_eq!(order[0], ids[3]);
    assert_eq!(order, vec![ids[3], ids[0], ids[1], ids[2], ids[4]]);

    s.swap(&coordinator(), ids[0], ids[4]).unwrap();
    assert_eq!(
        s.snapshot_with(&SnapshotQuery::all()).scheduled_ids(),
        vec![ids[3], ids[4], ids[1], ids[2], ids[0]]
    );
    assert_partition(&s, &ids);
}

#[tokio::test]
async fn cancel_on_done_job_changes_nothing() {
    let s = scheduler(SchedulerConfig::default());
    let dispatcher = s.spawn_dispatcher();

    let j1 = s.submit(job("j1")).unwrap();
    let j2 = s.submit(job("j2")).unwrap();
    wait_until(|| s.state_of(j1) == Some(JobState::Running)).await;
    s.report_done(j1, Ok(())).unwrap();
    wait_until(|| s.state_of(j2) == Some(JobState::Running)).await;

    let before = s.snapshot_with(&SnapshotQuery::all());
    let err = s.cancel(&coordinator(), j1).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidState { id, state: JobState::Done, .. } if id == j1));
    let after = s.snapshot_with(&SnapshotQuery::all());
    assert_eq!(before.scheduled_ids(), after.scheduled_ids());
    assert_eq!(before.running_ids(), after.running_ids());
    assert_eq!(before.done_ids(), after.done_ids());

    s.shutdown();
    dispatcher.await.unwrap();
}

#[tokio::test]
async fn parallel_slots_drain_the_queue() {
    let s = scheduler(SchedulerConfig { dispatch_slots: 3, ..Default::default() });
    let dispatcher = s.spawn_dispatcher();

    let ids: Vec<JobId> = (0..7).map(|i| s.submit(job(&format!("batch-{}", i))).unwrap()).collect();
    wait_until(|| s.status().active == 3).await;
    assert_eq!(s.status().scheduled, 4);

    let mut finished = 0;
    while finished < ids.len() {
        let running = s.snapshot_with(&SnapshotQuery::all()).running_ids();
        assert!(running.len() <= 3);
        for id in running {
            s.report_done(id, Ok(())).unwrap();
            finished += 1;
        }
        assert_partition(&s, &ids);
        if finished < ids.len() {
            wait_until(|| s.status().active > 0).await;
        }
    }

    let status = s.status();
    assert_eq!((status.scheduled, status.active, status.done), (0, 0, 7));
    assert_eq!(s.metrics().succeeded, 7);

    s.shutdown();
    dispatcher.await.unwrap();
}

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use pulsr_core::{
    Controller, EngineConfig, Error, ExecutionOutcome, REPORT_HEADER, RequestDef, StatsAggregator,
};
use tokio::sync::Notify;

fn request(method: http::Method, api: &str) -> RequestDef {
    RequestDef {
        api: api.to_string(),
        method,
        payload: None,
        query_params: Vec::new(),
    }
}

fn two_requests() -> Vec<RequestDef> {
    vec![
        request(http::Method::GET, "users"),
        request(http::Method::POST, "orders"),
    ]
}

fn ok_outcome() -> ExecutionOutcome {
    ExecutionOutcome {
        status: Some(200),
        body: Bytes::new(),
        latency_ms: 5,
        transport_error_kind: None,
        error: None,
    }
}

fn engine(tick: Duration) -> EngineConfig {
    EngineConfig {
        tick_interval: tick,
        max_in_flight: 8,
    }
}

#[tokio::test(start_paused = true)]
async fn stage_fires_floor_of_duration_over_interval_waves() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicU64::new(0));
    let stats = Arc::new(StatsAggregator::default());

    let fire = {
        let calls = calls.clone();
        move |_def: Arc<RequestDef>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                ok_outcome()
            }
        }
    };
    let controller = Arc::new(
        Controller::new(
            engine(Duration::from_secs(2)),
            two_requests(),
            dir.path().to_path_buf(),
            stats,
            fire,
        )
        .unwrap(),
    );

    let run = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run("warmup").await }
    });

    // 21s at a 2s tick: waves at 2,4,...,20 -> exactly 10.
    tokio::time::sleep(Duration::from_secs(21)).await;
    controller.close();
    run.await.unwrap().unwrap();

    let snapshot = controller.flush().await.unwrap();
    assert_eq!(snapshot.fired_total, 10 * 2);
    assert_eq!(calls.load(Ordering::SeqCst), 10 * 2);
    for req in &snapshot.requests {
        assert_eq!(req.total, 10, "request {}", req.name);
        assert_eq!(req.success, 10);
        assert_eq!(req.failed, 0);
    }

    let report = std::fs::read_to_string(dir.path().join("warmup.csv")).unwrap();
    assert!(report.starts_with(REPORT_HEADER));
    assert_eq!(report.lines().count(), 1 + 10 * 2);
}

#[tokio::test(start_paused = true)]
async fn run_closed_before_first_tick_fires_zero_waves() {
    let dir = tempfile::tempdir().unwrap();
    let stats = Arc::new(StatsAggregator::default());
    let controller = Arc::new(
        Controller::new(
            engine(Duration::from_secs(2)),
            two_requests(),
            dir.path().to_path_buf(),
            stats,
            |_def: Arc<RequestDef>| async { ok_outcome() },
        )
        .unwrap(),
    );

    let run = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run("brief").await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    controller.close();
    run.await.unwrap().unwrap();

    let snapshot = controller.flush().await.unwrap();
    assert_eq!(snapshot.fired_total, 0);
    assert_eq!(snapshot.requests.len(), 2);
    assert!(snapshot.requests.iter().all(|r| r.total == 0));

    // Header-only report for a stage that never ticked.
    let report = std::fs::read_to_string(dir.path().join("brief.csv")).unwrap();
    assert_eq!(report, format!("{REPORT_HEADER}\n"));
}

#[tokio::test(start_paused = true)]
async fn close_on_idle_controller_twice_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let stats = Arc::new(StatsAggregator::default());
    let controller = Controller::new(
        engine(Duration::from_secs(2)),
        two_requests(),
        dir.path().to_path_buf(),
        stats,
        |_def: Arc<RequestDef>| async { ok_outcome() },
    )
    .unwrap();

    controller.close();
    controller.close();

    // No run happened: flush returns an empty snapshot and writes nothing.
    let snapshot = tokio::time::timeout(Duration::from_secs(5), controller.flush())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.fired_total, 0);
    assert!(snapshot.requests.is_empty());
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test(start_paused = true)]
async fn flush_waits_for_in_flight_executions() {
    let dir = tempfile::tempdir().unwrap();
    let stats = Arc::new(StatsAggregator::default());
    let release = Arc::new(Notify::new());

    let fire = {
        let release = release.clone();
        move |_def: Arc<RequestDef>| {
            let release = release.clone();
            async move {
                release.notified().await;
                ok_outcome()
            }
        }
    };
    let controller = Arc::new(
        Controller::new(
            engine(Duration::from_secs(1)),
            two_requests(),
            dir.path().to_path_buf(),
            stats,
            fire,
        )
        .unwrap(),
    );

    let run = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run("slow").await }
    });

    // One wave dispatched; both executions are now parked in-flight.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    controller.close();
    run.await.unwrap().unwrap();
    assert_eq!(controller.outstanding(), 2);

    // Draining: flush must not complete while work is outstanding.
    let blocked = tokio::time::timeout(Duration::from_secs(5), controller.flush()).await;
    assert!(blocked.is_err(), "flush completed before drain");

    release.notify_waiters();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), controller.flush())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(controller.outstanding(), 0);
    assert_eq!(snapshot.fired_total, 2);
    assert!(snapshot.requests.iter().all(|r| r.total == 1));
}

#[tokio::test(start_paused = true)]
async fn new_run_blocks_until_previous_stage_drains() {
    let dir = tempfile::tempdir().unwrap();
    let stats = Arc::new(StatsAggregator::default());
    let release = Arc::new(Notify::new());
    let calls = Arc::new(AtomicU64::new(0));

    let fire = {
        let release = release.clone();
        let calls = calls.clone();
        move |_def: Arc<RequestDef>| {
            let release = release.clone();
            let calls = calls.clone();
            async move {
                // Only the first wave parks; later waves complete immediately.
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    release.notified().await;
                }
                ok_outcome()
            }
        }
    };
    let controller = Arc::new(
        Controller::new(
            engine(Duration::from_secs(1)),
            two_requests(),
            dir.path().to_path_buf(),
            stats,
            fire,
        )
        .unwrap(),
    );

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run("first").await }
    });
    tokio::time::sleep(Duration::from_millis(1500)).await;
    controller.close();
    first.await.unwrap().unwrap();
    assert_eq!(controller.outstanding(), 2);

    let second = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run("second").await }
    });

    // The second run must not tick while the first stage's work is in flight.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!second.is_finished());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    release.notify_waiters();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    controller.close();
    second.await.unwrap().unwrap();

    let snapshot = controller.flush().await.unwrap();
    // First stage's wave plus the second stage's waves, nothing lost.
    assert_eq!(snapshot.fired_total, calls.load(Ordering::SeqCst));
    assert!(calls.load(Ordering::SeqCst) > 2);
}

#[tokio::test(start_paused = true)]
async fn bounded_dispatch_records_every_counted_execution() {
    let dir = tempfile::tempdir().unwrap();
    let stats = Arc::new(StatsAggregator::default());

    // One permit forces every wave's executions to queue on the semaphore;
    // none of them may be counted as fired and then go unrecorded.
    let controller = Arc::new(
        Controller::new(
            EngineConfig {
                tick_interval: Duration::from_secs(1),
                max_in_flight: 1,
            },
            two_requests(),
            dir.path().to_path_buf(),
            stats,
            |_def: Arc<RequestDef>| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                ok_outcome()
            },
        )
        .unwrap(),
    );

    let run = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run("bounded").await }
    });

    tokio::time::sleep(Duration::from_millis(5500)).await;
    controller.close();
    run.await.unwrap().unwrap();

    let snapshot = controller.flush().await.unwrap();
    let recorded: u64 = snapshot.requests.iter().map(|r| r.total).sum();
    assert_eq!(snapshot.fired_total, 5 * 2);
    assert_eq!(recorded, snapshot.fired_total);
}

#[tokio::test]
async fn rejects_zero_tick_interval_and_zero_bound() {
    let stats = Arc::new(StatsAggregator::default());
    let err = Controller::new(
        engine(Duration::ZERO),
        two_requests(),
        std::env::temp_dir(),
        stats.clone(),
        |_def: Arc<RequestDef>| async { ok_outcome() },
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::InvalidTickInterval));

    let err = Controller::new(
        EngineConfig {
            tick_interval: Duration::from_secs(2),
            max_in_flight: 0,
        },
        two_requests(),
        std::env::temp_dir(),
        stats,
        |_def: Arc<RequestDef>| async { ok_outcome() },
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::InvalidMaxInFlight));
}

mod signal;

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::time::MissedTickBehavior;

use crate::config::{EngineConfig, RequestDef};
use crate::error::{Error, Result};
use crate::report;
use crate::request::ExecutionOutcome;
use crate::stats::{StatsAggregator, StatsSnapshot};

pub use signal::{StopSignal, WorkGuard, WorkTracker};

/// Owns the tick loop and the run lifecycle: Idle → Running → Draining → Idle.
///
/// Generic over the fire closure so the scheduling and drain machinery can be
/// exercised without a network. The production wiring passes a closure that
/// delegates to [`crate::RequestExecutor::execute`].
#[derive(Debug)]
pub struct Controller<F> {
    engine: EngineConfig,
    requests: Vec<(Arc<str>, Arc<RequestDef>)>,
    stats_folder: PathBuf,
    stats: Arc<StatsAggregator>,
    fire: F,

    stage: Mutex<Option<Arc<str>>>,
    stop: StopSignal,
    work: Arc<WorkTracker>,
    permits: Arc<Semaphore>,
    run_lock: tokio::sync::Mutex<()>,
}

impl<F, Fut> Controller<F>
where
    F: Fn(Arc<RequestDef>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ExecutionOutcome> + Send + 'static,
{
    pub fn new(
        engine: EngineConfig,
        requests: Vec<RequestDef>,
        stats_folder: PathBuf,
        stats: Arc<StatsAggregator>,
        fire: F,
    ) -> Result<Self> {
        if engine.tick_interval.is_zero() {
            return Err(Error::InvalidTickInterval);
        }
        if engine.max_in_flight == 0 {
            return Err(Error::InvalidMaxInFlight);
        }

        let max_in_flight = engine.max_in_flight;
        let requests = requests
            .into_iter()
            .map(|def| (Arc::<str>::from(def.name()), Arc::new(def)))
            .collect();

        Ok(Self {
            engine,
            requests,
            stats_folder,
            stats,
            fire,
            stage: Mutex::new(None),
            stop: StopSignal::default(),
            work: Arc::new(WorkTracker::default()),
            permits: Arc::new(Semaphore::new(max_in_flight)),
            run_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }

    /// Runs one stage until [`close`](Self::close) is observed. Two runs never
    /// interleave: a second caller blocks on the run lock, then on the drain
    /// of the previous stage's in-flight work.
    ///
    /// The first wave fires one full tick interval after start, so a run
    /// stopped before that dispatches nothing.
    pub async fn run(&self, stage: &str) -> Result<()> {
        let _active = self.run_lock.lock().await;
        self.work.drained().await;
        self.stop.reset();

        let stage: Arc<str> = Arc::from(stage);
        *self.lock_stage() = Some(stage.clone());
        for (name, _) in &self.requests {
            self.stats.ensure(name);
        }

        let start = tokio::time::Instant::now();
        let mut ticker =
            tokio::time::interval_at(start + self.engine.tick_interval, self.engine.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.stop.stopped() => return Ok(()),
                _ = ticker.tick() => self.dispatch_wave(&stage),
            }
        }
    }

    /// Fans out one execution per configured request and returns without
    /// awaiting any of them. Work is registered before the task starts so
    /// drain observes it even if the spawn has not been polled yet; the
    /// semaphore bounds how many executions run at once.
    fn dispatch_wave(&self, stage: &Arc<str>) {
        for (name, def) in &self.requests {
            self.stats.mark_fired();

            let guard = self.work.begin();
            let permits = self.permits.clone();
            let stats = self.stats.clone();
            let fire = self.fire.clone();
            let stage = stage.clone();
            let name = name.clone();
            let def = def.clone();

            tokio::spawn(async move {
                let _work = guard;
                // Every dispatched execution reaches the aggregator, so
                // `fired_total` and the recorded totals cannot drift apart.
                // The semaphore is never closed, but if it were, the failed
                // acquisition is recorded like any other failed execution.
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => fire(def).await,
                    Err(_) => ExecutionOutcome {
                        status: None,
                        body: bytes::Bytes::new(),
                        latency_ms: 0,
                        transport_error_kind: None,
                        error: Some("dispatch permit unavailable".to_string()),
                    },
                };
                stats.record(&name, &stage, &outcome);
            });
        }
    }

    /// Stops scheduling new ticks. Idempotent, never blocks, and a no-op on an
    /// idle controller. In-flight executions are not cancelled.
    pub fn close(&self) {
        self.stop.stop();
    }

    pub fn outstanding(&self) -> u64 {
        self.work.outstanding()
    }

    /// Drains in-flight executions, then extracts-and-resets all stats and
    /// writes the stage report. Counters are reset even when the report write
    /// fails, so a broken stats folder cannot grow memory unboundedly; the
    /// write error is still surfaced.
    pub async fn flush(&self) -> Result<StatsSnapshot> {
        self.work.drained().await;

        let stage = self.lock_stage().take();
        let snapshot = self.stats.snapshot();

        if let Some(stage) = stage {
            report::write_stage_report(&self.stats_folder, &stage, &snapshot.raw_rows)?;
        }

        Ok(snapshot)
    }

    fn lock_stage(&self) -> std::sync::MutexGuard<'_, Option<Arc<str>>> {
        self.stage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

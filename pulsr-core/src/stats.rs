use hdrhistogram::Histogram;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::request::ExecutionOutcome;

fn new_hist() -> Histogram<u64> {
    // Track up to 1h in milliseconds (with 3 sigfigs).
    Histogram::<u64>::new_with_bounds(1, 3_600_000, 3)
        .unwrap_or_else(|err| panic!("failed to init histogram: {err}"))
}

#[derive(Debug)]
struct RequestStats {
    total: u64,
    success: u64,
    failed: u64,
    latency_ms: Histogram<u64>,
    raw: Vec<String>,
}

impl RequestStats {
    fn new() -> Self {
        Self {
            total: 0,
            success: 0,
            failed: 0,
            latency_ms: new_hist(),
            raw: Vec::new(),
        }
    }

    fn summarize(&self, name: &str) -> RequestSummary {
        let latency = if self.total == 0 {
            LatencySummary::default()
        } else {
            LatencySummary {
                mean_ms: self.latency_ms.mean(),
                p50_ms: self.latency_ms.value_at_quantile(0.50),
                p90_ms: self.latency_ms.value_at_quantile(0.90),
                p99_ms: self.latency_ms.value_at_quantile(0.99),
                max_ms: self.latency_ms.max(),
            }
        };

        RequestSummary {
            name: name.to_string(),
            total: self.total,
            success: self.success,
            failed: self.failed,
            latency,
        }
    }

    fn reset(&mut self) {
        self.total = 0;
        self.success = 0;
        self.failed = 0;
        self.latency_ms.reset();
        self.raw.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencySummary {
    pub mean_ms: f64,
    pub p50_ms: u64,
    pub p90_ms: u64,
    pub p99_ms: u64,
    pub max_ms: u64,
}

/// Per-request counters since the last flush.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub name: String,
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub latency: LatencySummary,
}

/// Everything a flush extracts: summaries sorted by request name plus the raw
/// report rows, grouped per request in record order.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    /// Executions dispatched since the last snapshot.
    pub fired_total: u64,
    pub requests: Vec<RequestSummary>,
    pub raw_rows: Vec<String>,
}

/// Thread-safe accumulation keyed by request name.
///
/// Counter updates and the raw-row append for one completed execution happen
/// under a single lock, so `total == success + failed` is never observable
/// torn, no matter how many executions complete concurrently.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    table: Mutex<HashMap<String, RequestStats>>,
    fired_total: AtomicU64,
}

impl StatsAggregator {
    /// Registers a request so it shows up in snapshots even with zero calls.
    pub fn ensure(&self, name: &str) {
        let mut table = self.lock_table();
        table.entry(name.to_string()).or_insert_with(RequestStats::new);
    }

    pub fn mark_fired(&self) {
        self.fired_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fired_total(&self) -> u64 {
        self.fired_total.load(Ordering::Relaxed)
    }

    pub fn record(&self, name: &str, stage: &str, outcome: &ExecutionOutcome) {
        let row = format!(
            "{},{stage},{name},{},{}",
            humantime::format_rfc3339_millis(SystemTime::now()),
            outcome.status_label(),
            outcome.latency_ms,
        );

        let mut table = self.lock_table();
        let entry = table.entry(name.to_string()).or_insert_with(RequestStats::new);
        entry.total += 1;
        if outcome.is_success() {
            entry.success += 1;
        } else {
            entry.failed += 1;
        }
        entry.latency_ms.saturating_record(outcome.latency_ms);
        entry.raw.push(row);
    }

    /// Pure read plus atomic reset: returns the pre-reset state and leaves
    /// every counter, histogram, and raw log empty. Callers must have drained
    /// in-flight executions first or late completions land in the next stage.
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut table = self.lock_table();
        let fired_total = self.fired_total.swap(0, Ordering::AcqRel);

        let mut names: Vec<&String> = table.keys().collect();
        names.sort();
        let names: Vec<String> = names.into_iter().cloned().collect();

        let mut requests = Vec::with_capacity(names.len());
        let mut raw_rows = Vec::new();
        for name in &names {
            if let Some(stats) = table.get_mut(name) {
                requests.push(stats.summarize(name));
                raw_rows.append(&mut stats.raw);
                stats.reset();
            }
        }

        StatsSnapshot {
            fired_total,
            requests,
            raw_rows,
        }
    }

    fn lock_table(&self) -> std::sync::MutexGuard<'_, HashMap<String, RequestStats>> {
        self.table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

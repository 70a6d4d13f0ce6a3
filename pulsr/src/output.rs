use pulsr_core::StatsSnapshot;

/// Prints the per-request summary for one flushed stage.
pub(crate) fn print_stage_summary(stage: &str, snapshot: &StatsSnapshot) {
    println!(
        "stage {stage}: {} requests fired across {} APIs",
        snapshot.fired_total,
        snapshot.requests.len()
    );
    for req in &snapshot.requests {
        println!(
            "  {:<32} total={:<6} success={:<6} failed={:<6} p50={}ms p90={}ms p99={}ms max={}ms",
            req.name,
            req.total,
            req.success,
            req.failed,
            req.latency.p50_ms,
            req.latency.p90_ms,
            req.latency.p99_ms,
            req.latency.max_ms,
        );
    }
}

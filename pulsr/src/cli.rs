use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub(crate) fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    match unit_str.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            let secs = value
                .checked_mul(60)
                .and_then(|v| v.checked_mul(60))
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

/// One named experiment stage and how long to keep it ticking.
#[derive(Debug, Clone)]
pub struct StageArg {
    pub name: String,
    pub duration: Duration,
}

fn parse_stage(input: &str) -> Result<StageArg, String> {
    let (name, duration) = input
        .split_once(':')
        .ok_or_else(|| format!("invalid stage '{input}' (expected NAME:DURATION, e.g. warmup:10s)"))?;
    if name.is_empty() {
        return Err(format!("invalid stage '{input}' (stage name is empty)"));
    }
    Ok(StageArg {
        name: name.to_string(),
        duration: parse_duration(duration)?,
    })
}

#[derive(Debug, Parser)]
#[command(
    name = "pulsr",
    author,
    version,
    about = "Periodic, concurrent API load generator",
    long_about = "pulsr fires a configured set of HTTP requests in parallel on a fixed cadence, measures per-request latency and outcome, and writes one CSV report per experiment stage.\n\nThe request set (base URL, auth, cookies, per-request definitions) comes from a JSON config file; stages are named, time-boxed periods given on the command line and run back to back.",
    after_help = "Examples:\n  pulsr run --stage warmup:10s\n  pulsr run --config config/requests.json --stage ramp:30s --stage peak:60s\n  pulsr run --stage soak:5m --tick-interval 500ms --max-in-flight 128"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one or more experiment stages against the configured API
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the JSON request config
    #[arg(long, default_value = "config/requests.json")]
    pub config: PathBuf,

    /// Stage to run as NAME:DURATION; repeat for multiple sequential stages
    #[arg(long = "stage", value_parser = parse_stage, required = true)]
    pub stages: Vec<StageArg>,

    /// Interval between dispatch waves
    #[arg(long, value_parser = parse_duration, default_value = "2s")]
    pub tick_interval: Duration,

    /// Upper bound on concurrently in-flight requests
    #[arg(long, default_value_t = 64)]
    pub max_in_flight: usize,

    /// Per-request timeout (relies on transport defaults when omitted)
    #[arg(long, value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("42").unwrap(), Duration::from_secs(42));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn parses_stages() {
        let stage = parse_stage("warmup:10s").unwrap();
        assert_eq!(stage.name, "warmup");
        assert_eq!(stage.duration, Duration::from_secs(10));

        assert!(parse_stage("warmup").is_err());
        assert!(parse_stage(":10s").is_err());
        assert!(parse_stage("warmup:oops").is_err());
    }
}

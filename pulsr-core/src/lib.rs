#![forbid(unsafe_code)]

mod config;
mod controller;
mod error;
mod query;
mod report;
mod request;
mod stats;

pub use config::{ClientConfig, EngineConfig, RequestDef};
pub use controller::{Controller, StopSignal, WorkGuard, WorkTracker};
pub use error::{Error, Result};
pub use query::{QueryParamSpec, ValueKind, query_string};
pub use report::{REPORT_HEADER, write_stage_report};
pub use request::{ExecutionOutcome, RequestExecutor};
pub use stats::{LatencySummary, RequestSummary, StatsAggregator, StatsSnapshot};

pub use pulsr_http::{HttpClient, HttpRequest, HttpResponse, TransportErrorKind};

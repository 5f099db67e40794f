//! Telemetry data model
//!
//! The batching core treats these as opaque items. They only carry enough
//! structure for the producer handles to enrich them and for exporters to
//! serialize them.

pub mod common;
pub mod log;
pub mod metric;
pub mod trace;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub use common::{Attribute, AttributeValue, Resource};
pub use log::{LogRecord, SeverityLevel};
pub use metric::{
    AggregatedMetric, HistogramValue, MetricKind, MetricPoint, MetricTemporality, MetricValue,
};
pub use trace::{
    ErrorInfo, SpanData, SpanEvent, SpanKind, SpanLink, SpanSpec, SpanStatus, StatusCode,
    TraceContext, TRACE_FLAG_SAMPLED,
};

/// The three signal types, each with its own batcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Logs,
    Traces,
    Metrics,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::Traces => "traces",
            Self::Metrics => "metrics",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Get current time as Unix nanoseconds
pub fn current_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

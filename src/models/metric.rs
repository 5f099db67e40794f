use super::common::{Attribute, Resource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of metric instrument
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    #[default]
    Counter,
    UpDownCounter,
    Histogram,
    Gauge,
    ObservableCounter,
    ObservableUpDownCounter,
    ObservableGauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Counter => "Counter",
            Self::UpDownCounter => "UpDownCounter",
            Self::Histogram => "Histogram",
            Self::Gauge => "Gauge",
            Self::ObservableCounter => "ObservableCounter",
            Self::ObservableUpDownCounter => "ObservableUpDownCounter",
            Self::ObservableGauge => "ObservableGauge",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricTemporality {
    #[default]
    Delta,
    Cumulative,
}

/// Histogram data point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramValue {
    pub count: u64,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub bucket_counts: Vec<u64>,
    pub explicit_bounds: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricValue {
    Int(i64),
    Double(f64),
    Histogram(HistogramValue),
}

/// A single metric data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub kind: MetricKind,
    pub value: MetricValue,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Unix nanoseconds; assigned on record when absent
    pub timestamp_nanos: Option<u64>,
    pub temporality: MetricTemporality,
    pub resource: Option<Resource>,
}

impl MetricPoint {
    pub fn new(name: impl Into<String>, kind: MetricKind, value: MetricValue) -> Self {
        Self {
            name: name.into(),
            description: None,
            unit: None,
            kind,
            value,
            attributes: Vec::new(),
            timestamp_nanos: None,
            temporality: MetricTemporality::default(),
            resource: None,
        }
    }

    pub fn counter(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, MetricKind::Counter, MetricValue::Int(value))
    }

    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, MetricKind::Gauge, MetricValue::Double(value))
    }
}

/// Pre-aggregated metric data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetric {
    pub metric: MetricPoint,
    /// Number of raw measurements folded into `metric`
    pub count: u64,
    pub window_ms: u64,
}

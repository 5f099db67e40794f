use crate::models::Signal;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// What caused a batch to be flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Size,
    Timeout,
    Manual,
    Shutdown,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Timeout => "timeout",
            Self::Manual => "manual",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Install the Prometheus recorder for the pipeline's own metrics
///
/// Fails if a global recorder is already installed (e.g. a second call).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metric_descriptions();
    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "telemetry_batches_flushed_total",
        "Batches handed to the export callback, by signal and trigger"
    );
    describe_counter!(
        "telemetry_items_flushed_total",
        "Items handed to the export callback, by signal"
    );
    describe_counter!(
        "telemetry_export_total",
        "Per-exporter export attempts, by signal, exporter and status"
    );
    describe_counter!(
        "telemetry_items_dropped_total",
        "Items added to a stopped batcher"
    );
}

/// Record a flushed batch
pub fn record_flush(signal: Signal, trigger: FlushTrigger, items: usize) {
    counter!(
        "telemetry_batches_flushed_total",
        "signal" => signal.as_str(),
        "trigger" => trigger.as_str(),
    )
    .increment(1);
    counter!("telemetry_items_flushed_total", "signal" => signal.as_str()).increment(items as u64);
}

/// Record one exporter's outcome for one batch
pub fn record_export(signal: Signal, exporter: &str, success: bool) {
    counter!(
        "telemetry_export_total",
        "signal" => signal.as_str(),
        "exporter" => exporter.to_string(),
        "status" => if success { "success" } else { "failure" },
    )
    .increment(1);
}

/// Record an item dropped by a stopped batcher
pub fn record_dropped(signal: Signal) {
    counter!("telemetry_items_dropped_total", "signal" => signal.as_str()).increment(1);
}

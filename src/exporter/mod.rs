//! Exporter seam and multi-exporter fan-out
//!
//! Every registered exporter receives every batch. A failure in one exporter
//! is logged and counted but never stops delivery to the others, and never
//! fails the batcher's flush.

pub mod debug;
pub mod memory;

use crate::config::ExportProtocol;
use crate::error::ExportError;
use crate::metrics;
use crate::models::{LogRecord, MetricPoint, Signal, SpanData};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use debug::DebugExporter;
pub use memory::InMemoryExporter;

/// A telemetry sink (debug console, OTLP client, StatsD client, ...)
///
/// Implementations own their wire format, transport, timeouts and retries.
#[async_trait]
pub trait Exporter: Send + Sync + 'static {
    /// Exporter name used in logs and metrics
    fn name(&self) -> &str;

    async fn export_logs(&self, logs: &[LogRecord]) -> Result<(), ExportError>;

    async fn export_traces(&self, spans: &[SpanData]) -> Result<(), ExportError>;

    async fn export_metrics(&self, metrics: &[MetricPoint]) -> Result<(), ExportError>;

    /// Called once after the provider's final flush
    async fn shutdown(&self) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Outcome of delivering one batch to every exporter
#[derive(Debug, Default)]
pub struct FanOutReport {
    pub succeeded: usize,
    pub failures: Vec<ExportError>,
}

impl FanOutReport {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Exporters keyed by protocol
///
/// Built before the provider starts and read-only afterwards.
#[derive(Clone, Default)]
pub struct ExporterRegistry {
    exporters: BTreeMap<ExportProtocol, Arc<dyn Exporter>>,
}

impl ExporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exporter, returning the one it replaced
    pub fn register(
        &mut self,
        protocol: ExportProtocol,
        exporter: Arc<dyn Exporter>,
    ) -> Option<Arc<dyn Exporter>> {
        self.exporters.insert(protocol, exporter)
    }

    pub fn with(mut self, protocol: ExportProtocol, exporter: Arc<dyn Exporter>) -> Self {
        self.register(protocol, exporter);
        self
    }

    pub fn contains(&self, protocol: ExportProtocol) -> bool {
        self.exporters.contains_key(&protocol)
    }

    pub fn protocols(&self) -> impl Iterator<Item = ExportProtocol> + '_ {
        self.exporters.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.exporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }

    pub async fn export_logs(&self, logs: &[LogRecord]) -> FanOutReport {
        let results = join_all(
            self.exporters.values().map(|exporter| async move {
                (exporter.name(), exporter.export_logs(logs).await)
            }),
        )
        .await;
        summarize(Signal::Logs, logs.len(), results)
    }

    pub async fn export_traces(&self, spans: &[SpanData]) -> FanOutReport {
        let results = join_all(
            self.exporters.values().map(|exporter| async move {
                (exporter.name(), exporter.export_traces(spans).await)
            }),
        )
        .await;
        summarize(Signal::Traces, spans.len(), results)
    }

    pub async fn export_metrics(&self, points: &[MetricPoint]) -> FanOutReport {
        let results = join_all(
            self.exporters.values().map(|exporter| async move {
                (exporter.name(), exporter.export_metrics(points).await)
            }),
        )
        .await;
        summarize(Signal::Metrics, points.len(), results)
    }

    /// Shut down every exporter, logging failures
    pub async fn shutdown(&self) {
        for exporter in self.exporters.values() {
            if let Err(e) = exporter.shutdown().await {
                tracing::warn!(exporter = exporter.name(), error = %e, "Exporter shutdown failed");
            }
        }
    }
}

fn summarize(
    signal: Signal,
    count: usize,
    results: Vec<(&str, Result<(), ExportError>)>,
) -> FanOutReport {
    let mut report = FanOutReport::default();

    for (exporter, outcome) in results {
        match outcome {
            Ok(()) => {
                metrics::record_export(signal, exporter, true);
                report.succeeded += 1;
            }
            Err(e) => {
                metrics::record_export(signal, exporter, false);
                tracing::warn!(
                    signal = %signal,
                    exporter = exporter,
                    count = count,
                    error = %e,
                    "Exporter failed, continuing with remaining exporters"
                );
                report.failures.push(e);
            }
        }
    }

    report
}

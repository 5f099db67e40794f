//! Telemetry provider: configuration, batchers and lifecycle
//!
//! ```text
//! uninitialized ──initialize──▶ initialized ──shutdown──▶ shut down
//!                                    │
//!        Logger / Tracer / Meter ────┤ submit
//!                                    ▼
//!                 Batcher<LogRecord | SpanData | MetricPoint>
//!                                    │ batch
//!                                    ▼
//!                      ExporterRegistry fan-out
//! ```
//!
//! Shutdown drains and stops every batcher before the exporters are shut
//! down. Each batcher drains and stops under one lock acquisition, so an item
//! either makes the final batch or is dropped by the stopped batcher; it is
//! never left behind in a buffer nobody will flush. Producers that must not
//! lose items have to stop emitting before calling `shutdown`.

use crate::batching::Batcher;
use crate::config::{validate_config, ExportProtocol, ProviderConfig};
use crate::error::TelemetryError;
use crate::exporter::{DebugExporter, ExporterRegistry, FanOutReport};
use crate::logger::Logger;
use crate::meter::Meter;
use crate::models::{
    current_nanos, Attribute, LogRecord, MetricPoint, Resource, Signal, SpanData,
};
use crate::tracer::Tracer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

enum ProviderState {
    Uninitialized,
    Initialized(Arc<Pipeline>),
    ShutDown,
}

/// Entry point for producing telemetry
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct TelemetryProvider {
    state: Arc<RwLock<ProviderState>>,
}

impl TelemetryProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ProviderState::Uninitialized)),
        }
    }

    /// Initialize with the built-in exporters only
    pub async fn initialize(&self, config: ProviderConfig) -> Result<(), TelemetryError> {
        self.initialize_with_exporters(config, ExporterRegistry::new()).await
    }

    /// Initialize with additional exporters supplied by the application
    ///
    /// The debug exporter is registered automatically when the configured
    /// protocol is `debug-stdout`. Any other protocol must be present in
    /// `exporters`, otherwise initialization fails and the provider stays
    /// uninitialized.
    pub async fn initialize_with_exporters(
        &self,
        config: ProviderConfig,
        mut exporters: ExporterRegistry,
    ) -> Result<(), TelemetryError> {
        let mut state = self.state.write().await;
        match *state {
            ProviderState::Uninitialized => {}
            ProviderState::Initialized(_) => return Err(TelemetryError::AlreadyInitialized),
            ProviderState::ShutDown => return Err(TelemetryError::ShutDown),
        }

        validate_config(&config)?;

        if config.protocol == ExportProtocol::DebugStdout
            && !exporters.contains(ExportProtocol::DebugStdout)
        {
            exporters.register(ExportProtocol::DebugStdout, Arc::new(DebugExporter::new()));
        }
        if !exporters.contains(config.protocol) {
            return Err(TelemetryError::UnsupportedProtocol(config.protocol));
        }

        let pipeline = Pipeline::build(config, exporters)?;
        tracing::info!(
            service = %pipeline.config.service_name,
            protocol = %pipeline.config.protocol,
            exporters = pipeline.exporters.len(),
            batch_size = pipeline.config.batch_size,
            timeout_ms = pipeline.config.timeout_ms,
            batching = pipeline.config.batching_enabled,
            "Telemetry provider initialized"
        );

        *state = ProviderState::Initialized(Arc::new(pipeline));
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        matches!(*self.state.read().await, ProviderState::Initialized(_))
    }

    pub async fn is_shut_down(&self) -> bool {
        matches!(*self.state.read().await, ProviderState::ShutDown)
    }

    /// Active configuration, if initialized
    pub async fn config(&self) -> Option<ProviderConfig> {
        match &*self.state.read().await {
            ProviderState::Initialized(pipeline) => Some(pipeline.config.clone()),
            _ => None,
        }
    }

    pub async fn create_logger(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Logger, TelemetryError> {
        let pipeline = self.pipeline().await?;
        Ok(Logger::new(pipeline, name, version))
    }

    pub async fn create_tracer(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Tracer, TelemetryError> {
        let pipeline = self.pipeline().await?;
        Ok(Tracer::new(pipeline, name, version))
    }

    pub async fn create_meter(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Meter, TelemetryError> {
        let pipeline = self.pipeline().await?;
        Ok(Meter::new(pipeline, name, version))
    }

    /// Export logs immediately, bypassing the batcher
    pub async fn export_logs(&self, logs: Vec<LogRecord>) -> Result<(), TelemetryError> {
        let pipeline = self.pipeline().await?;
        pipeline.export_logs(&logs).await;
        Ok(())
    }

    /// Export spans immediately, bypassing the batcher
    pub async fn export_traces(&self, spans: Vec<SpanData>) -> Result<(), TelemetryError> {
        let pipeline = self.pipeline().await?;
        pipeline.export_traces(&spans).await;
        Ok(())
    }

    /// Export metric points immediately, bypassing the batcher
    pub async fn export_metrics(&self, points: Vec<MetricPoint>) -> Result<(), TelemetryError> {
        let pipeline = self.pipeline().await?;
        pipeline.export_metrics(&points).await;
        Ok(())
    }

    /// Flush all three batchers
    ///
    /// Every signal is flushed even if an earlier one fails; failures are
    /// returned together.
    pub async fn force_flush(&self) -> Result<(), TelemetryError> {
        let pipeline = self.pipeline().await?;
        pipeline.force_flush().await
    }

    /// Flush and stop every batcher, then shut the exporters down. Idempotent.
    ///
    /// The provider is marked shut down even if the final flush fails.
    pub async fn shutdown(&self) -> Result<(), TelemetryError> {
        let previous = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, ProviderState::ShutDown)
        };

        match previous {
            ProviderState::Initialized(pipeline) => {
                let result = pipeline.close().await;
                tracing::info!(
                    service = %pipeline.config.service_name,
                    clean = result.is_ok(),
                    "Telemetry provider shut down"
                );
                result
            }
            ProviderState::Uninitialized | ProviderState::ShutDown => Ok(()),
        }
    }

    async fn pipeline(&self) -> Result<Arc<Pipeline>, TelemetryError> {
        match &*self.state.read().await {
            ProviderState::Initialized(pipeline) => Ok(pipeline.clone()),
            ProviderState::Uninitialized => Err(TelemetryError::NotInitialized),
            ProviderState::ShutDown => Err(TelemetryError::ShutDown),
        }
    }
}

impl Default for TelemetryProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-provider plumbing shared with every producer handle
pub(crate) struct Pipeline {
    pub(crate) config: ProviderConfig,
    exporters: Arc<ExporterRegistry>,
    logs: Option<Batcher<LogRecord>>,
    traces: Option<Batcher<SpanData>>,
    metrics: Option<Batcher<MetricPoint>>,
    closed: AtomicBool,
}

impl Pipeline {
    fn build(config: ProviderConfig, exporters: ExporterRegistry) -> Result<Self, TelemetryError> {
        let exporters = Arc::new(exporters);

        let (logs, traces, metrics) = if config.batching_enabled {
            let size = config.batch_size as usize;
            let timeout = config.flush_timeout();
            let dev_mode = config.dev_mode;

            let registry = exporters.clone();
            let logs = Batcher::for_signal(
                Signal::Logs,
                size,
                timeout,
                move |batch: Vec<LogRecord>| {
                    let registry = registry.clone();
                    async move {
                        let report = registry.export_logs(&batch).await;
                        log_report(Signal::Logs, batch.len(), &report, dev_mode);
                        Ok(())
                    }
                },
            )?;

            let registry = exporters.clone();
            let traces = Batcher::for_signal(
                Signal::Traces,
                size,
                timeout,
                move |batch: Vec<SpanData>| {
                    let registry = registry.clone();
                    async move {
                        let report = registry.export_traces(&batch).await;
                        log_report(Signal::Traces, batch.len(), &report, dev_mode);
                        Ok(())
                    }
                },
            )?;

            let registry = exporters.clone();
            let metrics = Batcher::for_signal(
                Signal::Metrics,
                size,
                timeout,
                move |batch: Vec<MetricPoint>| {
                    let registry = registry.clone();
                    async move {
                        let report = registry.export_metrics(&batch).await;
                        log_report(Signal::Metrics, batch.len(), &report, dev_mode);
                        Ok(())
                    }
                },
            )?;

            (Some(logs), Some(traces), Some(metrics))
        } else {
            (None, None, None)
        };

        Ok(Self {
            config,
            exporters,
            logs,
            traces,
            metrics,
            closed: AtomicBool::new(false),
        })
    }

    /// Resource describing the service plus one instrumentation scope
    pub(crate) fn scope_resource(&self, scope: &str, name: &str) -> Resource {
        let config = &self.config;
        let mut attributes = vec![
            Attribute::new("service.name", config.service_name.as_str()),
            Attribute::new(format!("{}.name", scope), name),
        ];
        if let Some(version) = &config.service_version {
            attributes.push(Attribute::new("service.version", version.as_str()));
        }
        if let Some(environment) = &config.environment {
            attributes.push(Attribute::new("deployment.environment", environment.as_str()));
        }
        attributes.extend(config.resource_attributes.iter().cloned());

        Resource {
            attributes,
            schema_url: None,
        }
    }

    pub(crate) fn default_tags(&self) -> &[Attribute] {
        &self.config.default_tags
    }

    pub(crate) async fn submit_log(&self, record: LogRecord) -> Result<(), TelemetryError> {
        match &self.logs {
            Some(batcher) => batcher.add(record).await,
            None if self.is_closed() => Ok(()),
            None => {
                self.export_logs(&[record]).await;
                Ok(())
            }
        }
    }

    pub(crate) async fn submit_span(&self, span: SpanData) -> Result<(), TelemetryError> {
        match &self.traces {
            Some(batcher) => batcher.add(span).await,
            None if self.is_closed() => Ok(()),
            None => {
                self.export_traces(&[span]).await;
                Ok(())
            }
        }
    }

    pub(crate) async fn submit_metric(&self, point: MetricPoint) -> Result<(), TelemetryError> {
        match &self.metrics {
            Some(batcher) => batcher.add(point).await,
            None if self.is_closed() => Ok(()),
            None => {
                self.export_metrics(&[point]).await;
                Ok(())
            }
        }
    }

    async fn export_logs(&self, logs: &[LogRecord]) {
        let report = self.exporters.export_logs(logs).await;
        log_report(Signal::Logs, logs.len(), &report, self.config.dev_mode);
    }

    async fn export_traces(&self, spans: &[SpanData]) {
        let report = self.exporters.export_traces(spans).await;
        log_report(Signal::Traces, spans.len(), &report, self.config.dev_mode);
    }

    async fn export_metrics(&self, points: &[MetricPoint]) {
        let report = self.exporters.export_metrics(points).await;
        log_report(Signal::Metrics, points.len(), &report, self.config.dev_mode);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn force_flush(&self) -> Result<(), TelemetryError> {
        let mut failures = Vec::new();

        if let Some(batcher) = &self.logs {
            if let Err(e) = batcher.flush().await {
                failures.push((Signal::Logs, e.to_string()));
            }
        }
        if let Some(batcher) = &self.traces {
            if let Err(e) = batcher.flush().await {
                failures.push((Signal::Traces, e.to_string()));
            }
        }
        if let Some(batcher) = &self.metrics {
            if let Err(e) = batcher.flush().await {
                failures.push((Signal::Metrics, e.to_string()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TelemetryError::Flush { failures })
        }
    }

    async fn close(&self) -> Result<(), TelemetryError> {
        self.closed.store(true, Ordering::SeqCst);
        let mut failures = Vec::new();

        if let Some(batcher) = &self.logs {
            if let Err(e) = batcher.close().await {
                failures.push((Signal::Logs, e.to_string()));
            }
        }
        if let Some(batcher) = &self.traces {
            if let Err(e) = batcher.close().await {
                failures.push((Signal::Traces, e.to_string()));
            }
        }
        if let Some(batcher) = &self.metrics {
            if let Err(e) = batcher.close().await {
                failures.push((Signal::Metrics, e.to_string()));
            }
        }

        self.exporters.shutdown().await;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TelemetryError::Flush { failures })
        }
    }
}

/// Per-exporter failures were already logged by the registry
fn log_report(signal: Signal, count: usize, report: &FanOutReport, dev_mode: bool) {
    if dev_mode {
        tracing::info!(
            signal = %signal,
            count = count,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "Exported batch"
        );
    }
}

/// Timestamp for items that arrive without one
pub(crate) fn timestamp_or_now(timestamp: Option<u64>) -> u64 {
    timestamp.unwrap_or_else(current_nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::InMemoryExporter;
    use crate::models::SeverityLevel;

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            service_name: "canary-api".to_string(),
            service_version: Some("2.0.1".to_string()),
            environment: Some("dev".to_string()),
            resource_attributes: vec![Attribute::new("host.name", "node-1")],
            batch_size: 10,
            max_queue_size: 100,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let provider = TelemetryProvider::new();
        assert!(matches!(
            provider.create_logger("early", None).await,
            Err(TelemetryError::NotInitialized)
        ));
        assert!(matches!(provider.force_flush().await, Err(TelemetryError::NotInitialized)));

        provider.initialize(test_config()).await.unwrap();
        assert!(provider.is_initialized().await);
        assert!(matches!(
            provider.initialize(test_config()).await,
            Err(TelemetryError::AlreadyInitialized)
        ));

        provider.shutdown().await.unwrap();
        provider.shutdown().await.unwrap();
        assert!(provider.is_shut_down().await);
        assert!(matches!(
            provider.initialize(test_config()).await,
            Err(TelemetryError::ShutDown)
        ));
        assert!(matches!(
            provider.create_meter("late", None).await,
            Err(TelemetryError::ShutDown)
        ));
        assert!(matches!(
            provider.export_logs(vec![LogRecord::new(SeverityLevel::Info, "late")]).await,
            Err(TelemetryError::ShutDown)
        ));
    }

    #[tokio::test]
    async fn test_unsupported_protocol_leaves_provider_uninitialized() {
        let provider = TelemetryProvider::new();
        let config = ProviderConfig {
            protocol: ExportProtocol::OtlpHttp,
            endpoint: "http://collector:4318".to_string(),
            ..test_config()
        };

        let result = provider.initialize(config).await;
        assert!(matches!(
            result,
            Err(TelemetryError::UnsupportedProtocol(ExportProtocol::OtlpHttp))
        ));
        assert!(!provider.is_initialized().await);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let provider = TelemetryProvider::new();
        let config = ProviderConfig {
            batch_size: 0,
            ..test_config()
        };

        assert!(matches!(
            provider.initialize(config).await,
            Err(TelemetryError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_scope_resource() {
        let provider = TelemetryProvider::new();
        let memory = Arc::new(InMemoryExporter::new("memory"));
        provider
            .initialize_with_exporters(
                test_config(),
                ExporterRegistry::new().with(ExportProtocol::DebugStdout, memory),
            )
            .await
            .unwrap();

        let pipeline = provider.pipeline().await.unwrap();
        let resource = pipeline.scope_resource("logger", "auth");

        let keys: Vec<&str> = resource.attributes.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "service.name",
                "logger.name",
                "service.version",
                "deployment.environment",
                "host.name"
            ]
        );
    }

    #[tokio::test]
    async fn test_direct_export_reaches_every_exporter() {
        let provider = TelemetryProvider::new();
        let memory = Arc::new(InMemoryExporter::new("memory"));
        let statsd = Arc::new(InMemoryExporter::new("statsd"));
        provider
            .initialize_with_exporters(
                test_config(),
                ExporterRegistry::new()
                    .with(ExportProtocol::DebugStdout, memory.clone())
                    .with(ExportProtocol::StatsD, statsd.clone()),
            )
            .await
            .unwrap();

        provider
            .export_metrics(vec![MetricPoint::counter("jobs", 4)])
            .await
            .unwrap();

        assert_eq!(memory.metrics().len(), 1);
        assert_eq!(statsd.metrics().len(), 1);
    }
}

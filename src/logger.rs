use crate::error::TelemetryError;
use crate::models::{Attribute, LogRecord, Resource, TraceContext};
use crate::provider::{timestamp_or_now, Pipeline};
use std::sync::Arc;

/// Named log producer bound to a provider
///
/// The `with_*` methods return a new logger; the original is left unchanged.
/// Scoped values set that way are stamped onto every record the new logger emits.
#[derive(Clone)]
pub struct Logger {
    pipeline: Arc<Pipeline>,
    name: String,
    version: Option<String>,
    resource: Resource,
    trace_context: Option<TraceContext>,
    correlation_id: Option<String>,
    request_id: Option<String>,
    session_id: Option<String>,
}

impl Logger {
    pub(crate) fn new(pipeline: Arc<Pipeline>, name: &str, version: Option<&str>) -> Self {
        let resource = pipeline.scope_resource("logger", name);
        Self {
            pipeline,
            name: name.to_string(),
            version: version.map(str::to_string),
            resource,
            trace_context: None,
            correlation_id: None,
            request_id: None,
            session_id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub async fn emit(&self, record: LogRecord) -> Result<(), TelemetryError> {
        let record = self.enrich(record);
        self.pipeline.submit_log(record).await
    }

    /// Emit records in order, stopping at the first error
    pub async fn emit_batch<I>(&self, records: I) -> Result<(), TelemetryError>
    where
        I: IntoIterator<Item = LogRecord>,
    {
        for record in records {
            self.emit(record).await?;
        }
        Ok(())
    }

    pub fn with_trace_context(&self, context: TraceContext) -> Self {
        Self {
            trace_context: Some(context),
            ..self.clone()
        }
    }

    pub fn with_correlation_id(&self, id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(id.into()),
            ..self.clone()
        }
    }

    pub fn with_request_id(&self, id: impl Into<String>) -> Self {
        Self {
            request_id: Some(id.into()),
            ..self.clone()
        }
    }

    pub fn with_session_id(&self, id: impl Into<String>) -> Self {
        Self {
            session_id: Some(id.into()),
            ..self.clone()
        }
    }

    fn enrich(&self, mut record: LogRecord) -> LogRecord {
        record.resource = Some(self.resource.clone());
        record
            .attributes
            .extend(self.pipeline.default_tags().iter().cloned());
        if let Some(version) = &self.version {
            record
                .attributes
                .push(Attribute::new("logger.version", version.as_str()));
        }

        // Scoped values override whatever the caller put on the record
        if let Some(context) = &self.trace_context {
            record.trace_context = Some(context.clone());
        }
        if let Some(id) = &self.correlation_id {
            record.correlation_id = Some(id.clone());
        }
        if let Some(id) = &self.request_id {
            record.request_id = Some(id.clone());
        }
        if let Some(id) = &self.session_id {
            record.session_id = Some(id.clone());
        }

        record.timestamp_nanos = Some(timestamp_or_now(record.timestamp_nanos));
        record
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ExportProtocol, ProviderConfig};
    use crate::exporter::{ExporterRegistry, InMemoryExporter};
    use crate::models::{Attribute, AttributeValue, LogRecord, SeverityLevel, TraceContext};
    use crate::provider::TelemetryProvider;
    use std::sync::Arc;

    async fn unbatched() -> (TelemetryProvider, Arc<InMemoryExporter>) {
        let memory = Arc::new(InMemoryExporter::new("memory"));
        let provider = TelemetryProvider::new();
        provider
            .initialize_with_exporters(
                ProviderConfig {
                    service_name: "checkout".to_string(),
                    default_tags: vec![Attribute::new("team", "payments")],
                    batching_enabled: false,
                    ..Default::default()
                },
                ExporterRegistry::new().with(ExportProtocol::DebugStdout, memory.clone()),
            )
            .await
            .unwrap();
        (provider, memory)
    }

    #[tokio::test]
    async fn test_emit_enriches_record() {
        let (provider, memory) = unbatched().await;
        let logger = provider.create_logger("orders", Some("1.4.0")).await.unwrap();

        logger
            .emit(
                LogRecord::new(SeverityLevel::Warn, "slow query")
                    .with_attribute(Attribute::new("ms", 812i64)),
            )
            .await
            .unwrap();

        let logs = memory.logs();
        assert_eq!(logs.len(), 1);
        let record = &logs[0];
        assert!(record.timestamp_nanos.is_some());

        let keys: Vec<&str> = record.attributes.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["ms", "team", "logger.version"]);

        let resource = record.resource.as_ref().unwrap();
        assert_eq!(
            resource.get("service.name"),
            Some(&AttributeValue::String("checkout".to_string()))
        );
        assert_eq!(
            resource.get("logger.name"),
            Some(&AttributeValue::String("orders".to_string()))
        );
    }

    #[tokio::test]
    async fn test_scoped_loggers_are_independent() {
        let (provider, memory) = unbatched().await;
        let base = provider.create_logger("api", None).await.unwrap();
        let context = TraceContext {
            trace_id: "4bf92f3577b34da6a3ce929d0e0e4736".to_string(),
            span_id: "00f067aa0ba902b7".to_string(),
            trace_flags: 1,
            trace_state: None,
        };
        let scoped = base
            .with_trace_context(context.clone())
            .with_correlation_id("corr-1")
            .with_request_id("req-9")
            .with_session_id("sess-3");

        scoped.emit(LogRecord::new(SeverityLevel::Info, "scoped")).await.unwrap();
        base.emit(LogRecord::new(SeverityLevel::Info, "plain")).await.unwrap();

        let logs = memory.logs();
        assert_eq!(logs[0].trace_context.as_ref(), Some(&context));
        assert_eq!(logs[0].correlation_id.as_deref(), Some("corr-1"));
        assert_eq!(logs[0].request_id.as_deref(), Some("req-9"));
        assert_eq!(logs[0].session_id.as_deref(), Some("sess-3"));
        assert!(logs[1].trace_context.is_none());
        assert!(logs[1].correlation_id.is_none());
    }

    #[tokio::test]
    async fn test_emit_keeps_caller_timestamp() {
        let (provider, memory) = unbatched().await;
        let logger = provider.create_logger("api", None).await.unwrap();

        let mut record = LogRecord::new(SeverityLevel::Debug, "fixed");
        record.timestamp_nanos = Some(42);
        logger.emit_batch(vec![record]).await.unwrap();

        assert_eq!(memory.logs()[0].timestamp_nanos, Some(42));
    }

    #[tokio::test]
    async fn test_unbatched_logger_is_silent_after_shutdown() {
        let (provider, memory) = unbatched().await;
        let logger = provider.create_logger("api", None).await.unwrap();
        provider.shutdown().await.unwrap();

        logger.emit(LogRecord::new(SeverityLevel::Info, "late")).await.unwrap();
        assert!(memory.logs().is_empty());
    }
}

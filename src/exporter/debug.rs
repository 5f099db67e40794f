//! Human-readable exporter for development

use super::Exporter;
use crate::error::ExportError;
use crate::models::{LogRecord, MetricPoint, SpanData};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use std::sync::Mutex;

const NAME: &str = "debug-stdout";

/// Writes every batch to stdout (or any writer)
///
/// Logs are printed as indented text; spans and metric points as pretty JSON.
pub struct DebugExporter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl DebugExporter {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }

    /// Blocking write on the calling worker thread; acceptable for a debug sink
    fn write(&self, text: &str) -> Result<(), ExportError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| ExportError::transport(NAME, "output writer poisoned"))?;
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|source| ExportError::Io {
                exporter: NAME.to_string(),
                source,
            })
    }

    fn write_json<T: Serialize>(&self, header: &str, items: &[T]) -> Result<(), ExportError> {
        let body = serde_json::to_string_pretty(items).map_err(|source| ExportError::Serialization {
            exporter: NAME.to_string(),
            source,
        })?;
        self.write(&format!("=== DEBUG: Exporting {} ===\n{}\n", header, body))
    }
}

impl Default for DebugExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Exporter for DebugExporter {
    fn name(&self) -> &str {
        NAME
    }

    async fn export_logs(&self, logs: &[LogRecord]) -> Result<(), ExportError> {
        self.write(&format_logs(logs))
    }

    async fn export_traces(&self, spans: &[SpanData]) -> Result<(), ExportError> {
        self.write_json("Traces", spans)
    }

    async fn export_metrics(&self, metrics: &[MetricPoint]) -> Result<(), ExportError> {
        self.write_json("Metrics", metrics)
    }
}

fn format_logs(logs: &[LogRecord]) -> String {
    let mut text = String::from("=== DEBUG: Exporting Logs ===\n");

    for (i, log) in logs.iter().enumerate() {
        // Writing into a String cannot fail
        let _ = writeln!(text, "Log {}:", i + 1);
        if let Some(nanos) = log.timestamp_nanos {
            let _ = writeln!(text, "  Timestamp: {}", format_timestamp(nanos));
        }
        let severity = log
            .severity_text
            .clone()
            .unwrap_or_else(|| log.severity.to_string());
        let _ = writeln!(text, "  Severity: {}", severity);
        let _ = writeln!(text, "  Body: {}", log.body);

        if let Some(ctx) = &log.trace_context {
            let _ = writeln!(text, "  TraceID: {}", ctx.trace_id);
            let _ = writeln!(text, "  SpanID: {}", ctx.span_id);
        }
        for (label, value) in [
            ("CorrelationID", &log.correlation_id),
            ("RequestID", &log.request_id),
            ("SessionID", &log.session_id),
        ] {
            if let Some(value) = value {
                let _ = writeln!(text, "  {}: {}", label, value);
            }
        }

        if !log.attributes.is_empty() {
            text.push_str("  Attributes:\n");
            for attr in &log.attributes {
                let _ = writeln!(text, "    {}: {}", attr.key, attr.value);
            }
        }

        if let Some(resource) = log.resource.as_ref().filter(|r| !r.attributes.is_empty()) {
            text.push_str("  Resource:\n");
            for attr in &resource.attributes {
                let _ = writeln!(text, "    {}: {}", attr.key, attr.value);
            }
        }

        text.push('\n');
    }

    text
}

fn format_timestamp(nanos: u64) -> String {
    let secs = (nanos / 1_000_000_000) as i64;
    let subsec = (nanos % 1_000_000_000) as u32;
    chrono::DateTime::from_timestamp(secs, subsec)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| nanos.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attribute, MetricPoint, Resource, SeverityLevel};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[tokio::test]
    async fn test_logs_are_printed_as_text() {
        let buf = SharedBuf::default();
        let exporter = DebugExporter::with_writer(buf.clone());

        let mut record = LogRecord::new(SeverityLevel::Warn, "disk almost full")
            .with_attribute(Attribute::new("disk", "/dev/sda1"));
        record.timestamp_nanos = Some(0);
        record.request_id = Some("req-1".to_string());
        record.resource = Some(Resource {
            attributes: vec![Attribute::new("service.name", "feed")],
            schema_url: None,
        });

        exporter.export_logs(&[record]).await.unwrap();

        let out = buf.contents();
        assert!(out.starts_with("=== DEBUG: Exporting Logs ==="));
        assert!(out.contains("Log 1:"));
        assert!(out.contains("Timestamp: 1970-01-01T00:00:00+00:00"));
        assert!(out.contains("Severity: WARN"));
        assert!(out.contains("Body: disk almost full"));
        assert!(out.contains("RequestID: req-1"));
        assert!(out.contains("disk: /dev/sda1"));
        assert!(out.contains("service.name: feed"));
    }

    #[tokio::test]
    async fn test_metrics_are_printed_as_json() {
        let buf = SharedBuf::default();
        let exporter = DebugExporter::with_writer(buf.clone());

        exporter
            .export_metrics(&[MetricPoint::counter("http.requests", 3)])
            .await
            .unwrap();

        let out = buf.contents();
        assert!(out.starts_with("=== DEBUG: Exporting Metrics ==="));
        assert!(out.contains("\"name\": \"http.requests\""));
        assert!(out.contains("\"int\": 3"));
    }
}

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use telemetry_pipeline::metrics::init_metrics;
use telemetry_pipeline::models::{
    Attribute, ErrorInfo, LogRecord, MetricPoint, SeverityLevel, SpanKind, SpanSpec,
};
use telemetry_pipeline::TelemetryProvider;
use tracing::info;

use super::config::load_or_default;

#[derive(Debug, Clone, Copy)]
pub struct DemoCounts {
    pub logs: usize,
    pub spans: usize,
    pub metrics: usize,
}

/// Execute the demo command
///
/// Runs synthetic logs, spans and metrics through a provider and shuts it
/// down, which flushes whatever is still buffered.
pub async fn execute(path: Option<&Path>, counts: DemoCounts, show_metrics: bool) -> Result<()> {
    let handle = if show_metrics {
        Some(init_metrics()?)
    } else {
        None
    };

    let cfg = load_or_default(path)?;
    println!(
        "{}",
        format!(
            "Running demo for '{}' via {} ({} logs, {} spans, {} metrics)",
            cfg.service_name, cfg.protocol, counts.logs, counts.spans, counts.metrics
        )
        .yellow()
    );

    let provider = TelemetryProvider::new();
    provider.initialize(cfg).await?;

    let logger = provider.create_logger("demo", Some(env!("CARGO_PKG_VERSION"))).await?;
    let tracer = provider.create_tracer("demo", Some(env!("CARGO_PKG_VERSION"))).await?;
    let meter = provider.create_meter("demo", Some(env!("CARGO_PKG_VERSION"))).await?;

    let mut root = tracer.start_span(SpanSpec::new("demo.run").with_kind(SpanKind::Internal));
    let logger = logger
        .with_trace_context(root.context())
        .with_correlation_id(tracer.generate_correlation_id());

    for i in 0..counts.logs {
        let severity = if i % 5 == 4 {
            SeverityLevel::Warn
        } else {
            SeverityLevel::Info
        };
        logger
            .emit(
                LogRecord::new(severity, format!("demo log {}", i + 1))
                    .with_attribute(Attribute::new("demo.index", i as i64)),
            )
            .await?;
    }

    for i in 0..counts.spans {
        let mut span = tracer.start_span(
            SpanSpec::new(format!("demo.step.{}", i + 1)).with_parent(root.context()),
        );
        span.set_attributes(vec![Attribute::new("demo.index", i as i64)]);
        if i % 3 == 2 {
            span.record_error(&ErrorInfo {
                message: "synthetic failure".to_string(),
                error_type: Some("DemoError".to_string()),
                ..Default::default()
            });
        }
        span.end(None).await?;
    }

    let points = (0..counts.metrics)
        .map(|i| MetricPoint::counter("demo.events", i as i64 + 1))
        .collect::<Vec<_>>();
    meter.record_metrics(points).await?;

    root.end(None).await?;
    provider.shutdown().await?;
    info!("Demo telemetry flushed");

    println!("{}", "✓ Demo complete".green());

    if let Some(handle) = handle {
        println!();
        println!("{}", "Pipeline Metrics:".bold());
        println!("{}", handle.render());
    }

    Ok(())
}

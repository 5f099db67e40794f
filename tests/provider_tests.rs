/// Integration tests for the provider lifecycle and multi-exporter fan-out
use std::sync::Arc;
use std::time::Duration;
use telemetry_pipeline::config::{ExportProtocol, ProviderConfig};
use telemetry_pipeline::exporter::{ExporterRegistry, InMemoryExporter};
use telemetry_pipeline::models::{LogRecord, MetricPoint, SeverityLevel, SpanSpec};
use telemetry_pipeline::{TelemetryError, TelemetryProvider};

fn batched_config(batch_size: u32, timeout_ms: u32) -> ProviderConfig {
    ProviderConfig {
        service_name: "billing".to_string(),
        batch_size,
        timeout_ms,
        max_queue_size: batch_size * 10,
        ..Default::default()
    }
}

async fn provider_with(
    config: ProviderConfig,
    exporters: Vec<(ExportProtocol, Arc<InMemoryExporter>)>,
) -> TelemetryProvider {
    let mut registry = ExporterRegistry::new();
    for (protocol, exporter) in exporters {
        registry.register(protocol, exporter);
    }

    let provider = TelemetryProvider::new();
    provider
        .initialize_with_exporters(config, registry)
        .await
        .unwrap();
    provider
}

#[tokio::test(start_paused = true)]
async fn test_failing_exporter_does_not_blind_the_others() {
    let broken = Arc::new(InMemoryExporter::failing("broken"));
    let healthy = Arc::new(InMemoryExporter::new("healthy"));
    let provider = provider_with(
        batched_config(3, 1000),
        vec![
            (ExportProtocol::OtlpHttp, broken.clone()),
            (ExportProtocol::DebugStdout, healthy.clone()),
        ],
    )
    .await;
    let logger = provider.create_logger("payments", None).await.unwrap();

    for i in 0..3 {
        // The size-triggered flush must not surface the broken exporter's error
        logger
            .emit(LogRecord::new(SeverityLevel::Info, format!("charge {}", i)))
            .await
            .unwrap();
    }

    let bodies: Vec<String> = healthy.logs().into_iter().map(|log| log.body).collect();
    assert_eq!(bodies, vec!["charge 0", "charge 1", "charge 2"]);
    assert_eq!(broken.batch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_flush_through_provider() {
    let memory = Arc::new(InMemoryExporter::new("memory"));
    let provider = provider_with(
        batched_config(100, 500),
        vec![(ExportProtocol::DebugStdout, memory.clone())],
    )
    .await;
    let meter = provider.create_meter("jobs", None).await.unwrap();

    meter
        .record_metrics(vec![MetricPoint::counter("jobs.done", 1)])
        .await
        .unwrap();
    assert!(memory.metrics().is_empty());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(memory.metrics().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_force_flush_exports_every_signal() {
    let memory = Arc::new(InMemoryExporter::new("memory"));
    let provider = provider_with(
        batched_config(100, 60_000),
        vec![(ExportProtocol::DebugStdout, memory.clone())],
    )
    .await;

    let logger = provider.create_logger("api", None).await.unwrap();
    let tracer = provider.create_tracer("api", None).await.unwrap();
    let meter = provider.create_meter("api", None).await.unwrap();

    logger
        .emit(LogRecord::new(SeverityLevel::Error, "boom"))
        .await
        .unwrap();
    tracer
        .start_span(SpanSpec::new("handler"))
        .end(None)
        .await
        .unwrap();
    meter
        .record_metrics(vec![MetricPoint::gauge("queue.depth", 3.0)])
        .await
        .unwrap();
    assert_eq!(memory.batch_count(), 0);

    provider.force_flush().await.unwrap();
    assert_eq!(memory.batch_count(), 3);
    assert_eq!(memory.logs().len(), 1);
    assert_eq!(memory.spans().len(), 1);
    assert_eq!(memory.metrics().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_flushes_then_rejects_new_work() {
    let memory = Arc::new(InMemoryExporter::new("memory"));
    let provider = provider_with(
        batched_config(100, 60_000),
        vec![(ExportProtocol::DebugStdout, memory.clone())],
    )
    .await;
    let logger = provider.create_logger("api", None).await.unwrap();

    logger
        .emit_batch(vec![
            LogRecord::new(SeverityLevel::Info, "one"),
            LogRecord::new(SeverityLevel::Info, "two"),
        ])
        .await
        .unwrap();
    provider.shutdown().await.unwrap();
    assert_eq!(memory.logs().len(), 2);

    // Handles that outlive the provider become silent sinks
    logger
        .emit(LogRecord::new(SeverityLevel::Info, "after"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(memory.logs().len(), 2);

    assert!(matches!(
        provider.create_logger("late", None).await,
        Err(TelemetryError::ShutDown)
    ));
    assert!(matches!(provider.force_flush().await, Err(TelemetryError::ShutDown)));
    assert!(matches!(
        provider.initialize(batched_config(10, 100)).await,
        Err(TelemetryError::ShutDown)
    ));
}

#[tokio::test]
async fn test_unbatched_provider_exports_each_item_immediately() {
    let memory = Arc::new(InMemoryExporter::new("memory"));
    let config = ProviderConfig {
        batching_enabled: false,
        ..batched_config(100, 60_000)
    };
    let provider = provider_with(config, vec![(ExportProtocol::DebugStdout, memory.clone())]).await;
    let logger = provider.create_logger("api", None).await.unwrap();

    logger
        .emit(LogRecord::new(SeverityLevel::Info, "first"))
        .await
        .unwrap();
    logger
        .emit(LogRecord::new(SeverityLevel::Info, "second"))
        .await
        .unwrap();

    assert_eq!(memory.batch_count(), 2);
    provider.force_flush().await.unwrap();
    assert_eq!(memory.batch_count(), 2);
}

#[tokio::test]
async fn test_concurrent_shutdown_is_safe() {
    let memory = Arc::new(InMemoryExporter::new("memory"));
    let provider = provider_with(
        batched_config(50, 60_000),
        vec![(ExportProtocol::DebugStdout, memory.clone())],
    )
    .await;
    let logger = provider.create_logger("api", None).await.unwrap();
    logger
        .emit(LogRecord::new(SeverityLevel::Info, "pending"))
        .await
        .unwrap();

    let (a, b) = tokio::join!(provider.shutdown(), provider.shutdown());
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(memory.logs().len(), 1);
}

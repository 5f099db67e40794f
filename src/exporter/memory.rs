//! In-memory exporter for tests and embedding applications

use super::Exporter;
use crate::error::ExportError;
use crate::models::{LogRecord, MetricPoint, SpanData};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Keeps every exported item, or rejects every batch when set to fail
#[derive(Default)]
pub struct InMemoryExporter {
    name: String,
    fail: AtomicBool,
    batches: AtomicUsize,
    logs: Mutex<Vec<LogRecord>>,
    spans: Mutex<Vec<SpanData>>,
    metrics: Mutex<Vec<MetricPoint>>,
}

impl InMemoryExporter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// An exporter whose every export fails with a transport error
    pub fn failing(name: impl Into<String>) -> Self {
        let exporter = Self::new(name);
        exporter.set_failing(true);
        exporter
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of batches accepted (all signals)
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn logs(&self) -> Vec<LogRecord> {
        lock(&self.logs).clone()
    }

    pub fn spans(&self) -> Vec<SpanData> {
        lock(&self.spans).clone()
    }

    pub fn metrics(&self) -> Vec<MetricPoint> {
        lock(&self.metrics).clone()
    }

    fn accept<T: Clone>(&self, store: &Mutex<Vec<T>>, items: &[T]) -> Result<(), ExportError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExportError::transport(&self.name, "exporter configured to fail"));
        }
        lock(store).extend_from_slice(items);
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// A panicking test thread must not hide the items from the others
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Exporter for InMemoryExporter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn export_logs(&self, logs: &[LogRecord]) -> Result<(), ExportError> {
        self.accept(&self.logs, logs)
    }

    async fn export_traces(&self, spans: &[SpanData]) -> Result<(), ExportError> {
        self.accept(&self.spans, spans)
    }

    async fn export_metrics(&self, metrics: &[MetricPoint]) -> Result<(), ExportError> {
        self.accept(&self.metrics, metrics)
    }
}

//! Size- and time-triggered batch accumulator
//!
//! A [`Batcher`] buffers items one at a time and hands them to an export
//! callback in bulk, either when `max_size` items are pending or when the
//! flush timeout elapses, whichever comes first.
//!
//! ## Locking
//!
//! ```text
//! producers ──add──▶ [state mutex: pending, stopped] ──take──▶ export_fn(batch)
//!                                 ▲
//!                 timer task ─────┘
//! ```
//!
//! - The batch is taken under the state mutex and exported after it is
//!   released. A slow export never blocks other producers.
//! - `pending` never holds more than `max_size` items: the `add` that fills
//!   it takes exactly that batch. Each batch is a contiguous run of items in
//!   insertion order, but exports of consecutive batches may overlap.
//! - `add` runs the export on the caller's task when it fills the batch, and
//!   only waits for that one export.

use crate::error::TelemetryError;
use crate::metrics::{self, FlushTrigger};
use crate::models::Signal;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

/// Boxed export callback shared by the batcher and its timer task
pub type ExportFn<T> =
    Arc<dyn Fn(Vec<T>) -> BoxFuture<'static, Result<(), TelemetryError>> + Send + Sync>;

/// Generic batch accumulator
///
/// Cloning is cheap; all clones share the same buffer and timer.
pub struct Batcher<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Batcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<T> {
    state: Mutex<State<T>>,
    max_size: usize,
    timeout: Duration,
    export_fn: ExportFn<T>,
    /// Next timer deadline; `None` stops the timer task
    deadline: watch::Sender<Option<Instant>>,
    signal: Option<Signal>,
}

struct State<T> {
    pending: Vec<T>,
    stopped: bool,
}

impl<T: Send + 'static> Batcher<T> {
    /// Create a batcher and arm its flush timer
    ///
    /// Must be called from within a Tokio runtime. `max_size` must be at
    /// least 1 and `timeout` must be non-zero.
    pub fn new<F, Fut>(
        max_size: usize,
        timeout: Duration,
        export_fn: F,
    ) -> Result<Self, TelemetryError>
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TelemetryError>> + Send + 'static,
    {
        Self::build(max_size, timeout, export_fn, None)
    }

    /// Same as [`Batcher::new`], labelling flushes with `signal` in self-metrics and logs
    pub fn for_signal<F, Fut>(
        signal: Signal,
        max_size: usize,
        timeout: Duration,
        export_fn: F,
    ) -> Result<Self, TelemetryError>
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TelemetryError>> + Send + 'static,
    {
        Self::build(max_size, timeout, export_fn, Some(signal))
    }

    fn build<F, Fut>(
        max_size: usize,
        timeout: Duration,
        export_fn: F,
        signal: Option<Signal>,
    ) -> Result<Self, TelemetryError>
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TelemetryError>> + Send + 'static,
    {
        if max_size == 0 {
            return Err(TelemetryError::Config("batch max size must be at least 1".to_string()));
        }
        if timeout.is_zero() {
            return Err(TelemetryError::Config("batch timeout must be greater than 0".to_string()));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            TelemetryError::Config("a batcher must be created inside a Tokio runtime".to_string())
        })?;

        let export_fn: ExportFn<T> = Arc::new(move |batch| export_fn(batch).boxed());
        let (deadline, receiver) = watch::channel(Some(Instant::now() + timeout));

        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                pending: Vec::with_capacity(max_size.min(1024)),
                stopped: false,
            }),
            max_size,
            timeout,
            export_fn,
            deadline,
            signal,
        });

        runtime.spawn(run_timer(Arc::downgrade(&inner), receiver));

        Ok(Self { inner })
    }

    /// Add an item, flushing synchronously if the batch is now full
    ///
    /// Items added after [`Batcher::stop`] are dropped without error.
    /// Returns the export callback's error when this call triggered the flush.
    pub async fn add(&self, item: T) -> Result<(), TelemetryError> {
        let batch = {
            let mut state = self.inner.state.lock().await;
            if state.stopped {
                if let Some(signal) = self.inner.signal {
                    metrics::record_dropped(signal);
                }
                tracing::trace!(signal = ?self.inner.signal, "Batcher stopped, dropping item");
                return Ok(());
            }

            state.pending.push(item);
            if state.pending.len() < self.inner.max_size {
                return Ok(());
            }
            self.inner.rearm();
            std::mem::take(&mut state.pending)
        };

        self.inner.export(batch, FlushTrigger::Size).await
    }

    /// Export whatever is pending, even below the size threshold
    ///
    /// No-op when nothing is pending or the batcher is stopped.
    pub async fn flush(&self) -> Result<(), TelemetryError> {
        self.inner.flush(FlushTrigger::Manual).await
    }

    /// Stop the batcher and cancel its timer. Idempotent.
    ///
    /// Does not flush: pending items are discarded. Use [`Batcher::close`]
    /// or call [`Batcher::flush`] first when they must be delivered.
    pub async fn stop(&self) {
        let mut state = self.inner.state.lock().await;
        if state.stopped {
            return;
        }
        state.stopped = true;
        self.inner.deadline.send_replace(None);

        let discarded = state.pending.len();
        state.pending.clear();
        if discarded > 0 {
            tracing::warn!(
                signal = ?self.inner.signal,
                discarded = discarded,
                "Batcher stopped with unflushed items"
            );
        }
    }

    /// Drain and stop in one step
    ///
    /// Pending items are taken and the batcher marked stopped under the same
    /// lock, so no `add` can land between the final flush and the stop.
    pub async fn close(&self) -> Result<(), TelemetryError> {
        let batch = {
            let mut state = self.inner.state.lock().await;
            if state.stopped {
                return Ok(());
            }
            state.stopped = true;
            self.inner.deadline.send_replace(None);
            std::mem::take(&mut state.pending)
        };

        if batch.is_empty() {
            return Ok(());
        }
        self.inner.export(batch, FlushTrigger::Shutdown).await
    }

    /// Number of items waiting for the next flush
    pub async fn pending_len(&self) -> usize {
        self.inner.state.lock().await.pending.len()
    }

    pub async fn is_stopped(&self) -> bool {
        self.inner.state.lock().await.stopped
    }

    pub fn max_size(&self) -> usize {
        self.inner.max_size
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }
}

impl<T: Send + 'static> Inner<T> {
    async fn flush(&self, trigger: FlushTrigger) -> Result<(), TelemetryError> {
        let batch = {
            let mut state = self.state.lock().await;
            if state.stopped || state.pending.is_empty() {
                return Ok(());
            }
            self.rearm();
            std::mem::take(&mut state.pending)
        };

        self.export(batch, trigger).await
    }

    async fn on_timeout(&self) {
        let batch = {
            let mut state = self.state.lock().await;
            if state.stopped {
                return;
            }
            // A flush may have pushed the deadline out while we waited for the lock
            match *self.deadline.borrow() {
                Some(at) if at <= Instant::now() => {}
                _ => return,
            }
            self.rearm();
            std::mem::take(&mut state.pending)
        };

        if batch.is_empty() {
            return;
        }

        let count = batch.len();
        if let Err(e) = self.export(batch, FlushTrigger::Timeout).await {
            tracing::warn!(
                signal = ?self.signal,
                error = %e,
                count = count,
                "Timed flush failed"
            );
        }
    }

    /// Caller holds the state lock
    fn rearm(&self) {
        self.deadline.send_replace(Some(Instant::now() + self.timeout));
    }

    async fn export(&self, batch: Vec<T>, trigger: FlushTrigger) -> Result<(), TelemetryError> {
        let count = batch.len();
        if let Some(signal) = self.signal {
            metrics::record_flush(signal, trigger, count);
        }
        tracing::debug!(
            signal = ?self.signal,
            trigger = trigger.as_str(),
            count = count,
            "Flushing batch"
        );

        (self.export_fn)(batch).await
    }
}

/// Background timer task
///
/// Sleeps until the current deadline, flushes, and re-arms. Exits when the
/// batcher is stopped (deadline `None`) or every handle has been dropped.
async fn run_timer<T: Send + 'static>(
    inner: Weak<Inner<T>>,
    mut deadline: watch::Receiver<Option<Instant>>,
) {
    loop {
        let Some(at) = *deadline.borrow_and_update() else {
            break;
        };

        tokio::select! {
            _ = tokio::time::sleep_until(at) => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.on_timeout().await;
            }
            changed = deadline.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

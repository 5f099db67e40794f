//! Batching and fan-out core for a telemetry client
//!
//! Producer handles ([`Logger`], [`Tracer`], [`Meter`]) enrich items and hand
//! them to one [`Batcher`] per signal. Batches are fanned out to every
//! registered [`Exporter`]; one exporter failing never stops the others.

pub mod batching;
pub mod config;
pub mod error;
pub mod exporter;
pub mod handles;
pub mod host;
pub mod logger;
pub mod meter;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod tracer;

pub use batching::Batcher;
pub use config::{ExportProtocol, ProviderConfig};
pub use error::{ExportError, TelemetryError};
pub use exporter::{Exporter, ExporterRegistry};
pub use host::TelemetryHost;
pub use logger::Logger;
pub use meter::Meter;
pub use provider::TelemetryProvider;
pub use tracer::{Span, Tracer};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// `RUST_LOG` wins over `level` when set. Can only be called once.
pub fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

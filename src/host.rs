//! Handle-based facade over providers and loggers
//!
//! Embedders that cannot hold Rust references (plugin hosts, FFI layers)
//! address providers and loggers through [`Handle`]s. Unknown or stale
//! handles yield [`TelemetryError::InvalidHandle`].

use crate::config::{ExportProtocol, ProviderConfig, SamplingStrategy};
use crate::error::TelemetryError;
use crate::handles::{Handle, HandleTable};
use crate::logger::Logger;
use crate::models::LogRecord;
use crate::provider::TelemetryProvider;
use tokio::sync::Mutex;

/// Settings a guest supplies when constructing a provider
///
/// Everything else comes from [`HostDefaults`].
#[derive(Debug, Clone)]
pub struct GuestProviderConfig {
    pub endpoint: String,
    pub service_name: String,
    pub dev_mode: bool,
}

/// Provider defaults applied to guest-constructed providers
#[derive(Debug, Clone)]
pub struct HostDefaults {
    pub protocol: ExportProtocol,
    pub batch_size: u32,
    pub timeout_ms: u32,
    pub max_queue_size: u32,
    pub sampling: SamplingStrategy,
}

impl Default for HostDefaults {
    fn default() -> Self {
        Self {
            protocol: ExportProtocol::DebugStdout,
            batch_size: 10,
            timeout_ms: 1000,
            max_queue_size: 100,
            sampling: SamplingStrategy::AlwaysOn,
        }
    }
}

impl HostDefaults {
    pub fn provider_config(&self, guest: GuestProviderConfig) -> ProviderConfig {
        ProviderConfig {
            endpoint: guest.endpoint,
            protocol: self.protocol,
            service_name: guest.service_name,
            timeout_ms: self.timeout_ms,
            batch_size: self.batch_size,
            max_queue_size: self.max_queue_size,
            sampling: self.sampling,
            dev_mode: guest.dev_mode,
            ..Default::default()
        }
    }
}

struct LoggerEntry {
    provider: Handle,
    logger: Logger,
}

#[derive(Default)]
struct Tables {
    providers: HandleTable<TelemetryProvider>,
    loggers: HandleTable<LoggerEntry>,
}

pub struct TelemetryHost {
    tables: Mutex<Tables>,
    defaults: HostDefaults,
}

impl TelemetryHost {
    pub fn new() -> Self {
        Self::with_defaults(HostDefaults::default())
    }

    pub fn with_defaults(defaults: HostDefaults) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            defaults,
        }
    }

    pub fn defaults(&self) -> &HostDefaults {
        &self.defaults
    }

    /// Construct and initialize a provider
    ///
    /// The handle is returned even when initialization fails; the failure is
    /// logged and later calls through the handle report `NotInitialized`.
    pub async fn create_provider(&self, guest: GuestProviderConfig) -> Handle {
        let config = self.defaults.provider_config(guest);
        let service = config.service_name.clone();

        let provider = TelemetryProvider::new();
        if let Err(e) = provider.initialize(config).await {
            tracing::error!(service = %service, error = %e, "Failed to initialize guest provider");
        }

        self.tables.lock().await.providers.insert(provider)
    }

    /// Shut a provider down and release it together with its loggers
    pub async fn destroy_provider(&self, handle: Handle) -> Result<(), TelemetryError> {
        let provider = {
            let mut tables = self.tables.lock().await;
            let provider = tables
                .providers
                .remove(handle)
                .ok_or(TelemetryError::InvalidHandle)?;
            tables.loggers.retain(|entry| entry.provider != handle);
            provider
        };

        provider.shutdown().await
    }

    pub async fn create_logger(
        &self,
        provider: Handle,
        name: &str,
    ) -> Result<Handle, TelemetryError> {
        let provider_ref = {
            let tables = self.tables.lock().await;
            tables
                .providers
                .get(provider)
                .cloned()
                .ok_or(TelemetryError::InvalidHandle)?
        };

        let logger = provider_ref.create_logger(name, None).await?;

        let mut tables = self.tables.lock().await;
        // The provider may have been destroyed while the logger was created
        if tables.providers.get(provider).is_none() {
            return Err(TelemetryError::InvalidHandle);
        }
        Ok(tables.loggers.insert(LoggerEntry { provider, logger }))
    }

    pub async fn logger_emit(
        &self,
        logger: Handle,
        record: LogRecord,
    ) -> Result<(), TelemetryError> {
        let logger = {
            let tables = self.tables.lock().await;
            tables
                .loggers
                .get(logger)
                .map(|entry| entry.logger.clone())
                .ok_or(TelemetryError::InvalidHandle)?
        };

        logger.emit(record).await
    }

    pub async fn drop_logger(&self, logger: Handle) -> Result<(), TelemetryError> {
        self.tables
            .lock()
            .await
            .loggers
            .remove(logger)
            .map(|_| ())
            .ok_or(TelemetryError::InvalidHandle)
    }

    pub async fn provider_count(&self) -> usize {
        self.tables.lock().await.providers.len()
    }

    pub async fn logger_count(&self) -> usize {
        self.tables.lock().await.loggers.len()
    }

    /// Shut down every provider still held by the host
    pub async fn shutdown(&self) {
        let providers = {
            let mut tables = self.tables.lock().await;
            tables.loggers.drain();
            tables.providers.drain()
        };

        for provider in providers {
            if let Err(e) = provider.shutdown().await {
                tracing::warn!(error = %e, "Provider shutdown reported errors");
            }
        }
    }
}

impl Default for TelemetryHost {
    fn default() -> Self {
        Self::new()
    }
}

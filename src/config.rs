use crate::error::TelemetryError;
use crate::models::Attribute;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Export protocol selector
///
/// Only `DebugStdout` ships with this crate; the others are served by
/// exporters registered by the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportProtocol {
    OtlpHttp,
    OtlpGrpc,
    #[serde(rename = "statsd")]
    StatsD,
    Prometheus,
    Zipkin,
    Jaeger,
    DebugStdout,
}

impl ExportProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OtlpHttp => "otlp-http",
            Self::OtlpGrpc => "otlp-grpc",
            Self::StatsD => "statsd",
            Self::Prometheus => "prometheus",
            Self::Zipkin => "zipkin",
            Self::Jaeger => "jaeger",
            Self::DebugStdout => "debug-stdout",
        }
    }

    /// Whether this protocol talks to a remote endpoint
    pub fn is_network(&self) -> bool {
        !matches!(self, Self::DebugStdout)
    }
}

impl fmt::Display for ExportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling strategy (carried for exporters; the batching core does not sample)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingStrategy {
    #[default]
    AlwaysOn,
    AlwaysOff,
    Probability,
    ParentBased,
}

/// Extra header sent by network exporters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

/// Telemetry provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub protocol: ExportProtocol,
    pub service_name: String,
    pub service_version: Option<String>,
    pub environment: Option<String>,
    pub resource_attributes: Vec<Attribute>,
    /// Appended to every emitted item's attributes
    pub default_tags: Vec<Attribute>,
    pub headers: Vec<Header>,
    pub compression: bool,
    /// Flush timeout per batcher, in milliseconds
    pub timeout_ms: u32,
    /// Items per batch before a size-triggered flush
    pub batch_size: u32,
    /// Validated against `batch_size`; no backpressure is applied
    pub max_queue_size: u32,
    pub sampling: SamplingStrategy,
    pub dev_mode: bool,
    /// When false, handles export every item synchronously without batching
    pub batching_enabled: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            protocol: ExportProtocol::DebugStdout,
            service_name: "unknown_service".to_string(),
            service_version: None,
            environment: None,
            resource_attributes: Vec::new(),
            default_tags: Vec::new(),
            headers: Vec::new(),
            compression: false,
            timeout_ms: 1000,
            batch_size: 512,
            max_queue_size: 2048,
            sampling: SamplingStrategy::AlwaysOn,
            dev_mode: false,
            batching_enabled: true,
        }
    }
}

impl ProviderConfig {
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.timeout_ms))
    }
}

/// Load configuration from a TOML file with `TELEMETRY__*` environment overrides
pub fn load_config(path: &Path) -> anyhow::Result<ProviderConfig> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).format(config::FileFormat::Toml))
        .add_source(config::Environment::with_prefix("TELEMETRY").separator("__"))
        .build()?;

    let cfg: ProviderConfig = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

/// Semantic checks run before a provider accepts a configuration
pub fn validate_config(cfg: &ProviderConfig) -> Result<(), TelemetryError> {
    if cfg.service_name.trim().is_empty() {
        return Err(TelemetryError::Config("service_name cannot be empty".to_string()));
    }

    if cfg.batch_size == 0 {
        return Err(TelemetryError::Config("batch_size must be at least 1".to_string()));
    }

    if cfg.timeout_ms == 0 {
        return Err(TelemetryError::Config("timeout_ms must be greater than 0".to_string()));
    }

    if cfg.max_queue_size < cfg.batch_size {
        return Err(TelemetryError::Config(format!(
            "max_queue_size ({}) must not be smaller than batch_size ({})",
            cfg.max_queue_size, cfg.batch_size
        )));
    }

    if cfg.protocol.is_network() && cfg.endpoint.trim().is_empty() {
        return Err(TelemetryError::Config(format!(
            "protocol '{}' requires an endpoint",
            cfg.protocol
        )));
    }

    Ok(())
}

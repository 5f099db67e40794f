use crate::config::ExportProtocol;
use crate::models::Signal;
use std::fmt;

/// Errors surfaced by the telemetry pipeline to its callers
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Invalid configuration, fatal to initialization
    #[error("Configuration error: {0}")]
    Config(String),

    /// No exporter is available for the configured protocol
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(ExportProtocol),

    #[error("provider is not initialized")]
    NotInitialized,

    #[error("provider is already initialized")]
    AlreadyInitialized,

    #[error("provider is shut down")]
    ShutDown,

    /// Export failure reported by a single exporter
    #[error(transparent)]
    Export(#[from] ExportError),

    /// One or more signal types failed to flush; every signal was still attempted
    #[error("failed to flush {}", FailureList(.failures))]
    Flush { failures: Vec<(Signal, String)> },

    /// A host handle that does not (or no longer) refer to a live resource
    #[error("invalid handle")]
    InvalidHandle,

    #[error("Invalid trace context: {0}")]
    InvalidTraceContext(String),
}

impl TelemetryError {
    /// Short machine-readable name, used as a log/metric label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::UnsupportedProtocol(_) => "unsupported_protocol",
            Self::NotInitialized => "not_initialized",
            Self::AlreadyInitialized => "already_initialized",
            Self::ShutDown => "shut_down",
            Self::Export(_) => "export_error",
            Self::Flush { .. } => "flush_error",
            Self::InvalidHandle => "invalid_handle",
            Self::InvalidTraceContext(_) => "invalid_trace_context",
        }
    }
}

/// Error returned by an [`Exporter`](crate::exporter::Exporter) for one batch
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{exporter}: I/O error: {source}")]
    Io {
        exporter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{exporter}: serialization error: {source}")]
    Serialization {
        exporter: String,
        #[source]
        source: serde_json::Error,
    },

    /// Transmission to a remote collector failed
    #[error("{exporter}: transport error: {message}")]
    Transport { exporter: String, message: String },
}

impl ExportError {
    pub fn transport(exporter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            exporter: exporter.into(),
            message: message.into(),
        }
    }

    /// Name of the exporter that produced the error
    pub fn exporter(&self) -> &str {
        match self {
            Self::Io { exporter, .. }
            | Self::Serialization { exporter, .. }
            | Self::Transport { exporter, .. } => exporter,
        }
    }
}

struct FailureList<'a>(&'a [(Signal, String)]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (signal, message)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", signal, message)?;
        }
        Ok(())
    }
}

use super::common::{Attribute, Resource};
use super::trace::TraceContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Log severity levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        };
        f.write_str(text)
    }
}

/// A single log entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub body: String,
    pub severity: SeverityLevel,
    pub severity_text: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub trace_context: Option<TraceContext>,
    pub correlation_id: Option<String>,
    pub request_id: Option<String>,
    pub session_id: Option<String>,
    /// Unix nanoseconds; assigned on emit when absent
    pub timestamp_nanos: Option<u64>,
    pub resource: Option<Resource>,
}

impl LogRecord {
    pub fn new(severity: SeverityLevel, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            severity,
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

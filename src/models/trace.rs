use super::common::{Attribute, Resource};
use crate::error::TelemetryError;
use serde::{Deserialize, Serialize};

/// Sampled bit of the W3C trace flags
pub const TRACE_FLAG_SAMPLED: u8 = 0x01;

/// W3C trace context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// 32 lowercase hex characters
    pub trace_id: String,
    /// 16 lowercase hex characters
    pub span_id: String,
    pub trace_flags: u8,
    pub trace_state: Option<String>,
}

impl TraceContext {
    /// Format as a `traceparent` header value (version 00)
    pub fn to_traceparent(&self) -> String {
        format!("00-{}-{}-{:02x}", self.trace_id, self.span_id, self.trace_flags)
    }

    /// Parse a `traceparent` header value
    pub fn from_traceparent(value: &str) -> Result<Self, TelemetryError> {
        let invalid = |reason: &str| {
            TelemetryError::InvalidTraceContext(format!("{}: {:?}", reason, value))
        };

        let parts: Vec<&str> = value.trim().split('-').collect();
        if parts.len() < 4 {
            return Err(invalid("expected 4 fields"));
        }
        let (version, trace_id, span_id, flags) = (parts[0], parts[1], parts[2], parts[3]);

        if version.len() != 2 || !is_lower_hex(version) || version == "ff" {
            return Err(invalid("bad version"));
        }
        // Version 00 defines exactly four fields; later versions may append more
        if version == "00" && parts.len() != 4 {
            return Err(invalid("unexpected trailing fields"));
        }
        if trace_id.len() != 32 || !is_lower_hex(trace_id) || is_all_zero(trace_id) {
            return Err(invalid("bad trace id"));
        }
        if span_id.len() != 16 || !is_lower_hex(span_id) || is_all_zero(span_id) {
            return Err(invalid("bad span id"));
        }
        if flags.len() != 2 || !is_lower_hex(flags) {
            return Err(invalid("bad trace flags"));
        }
        let trace_flags = u8::from_str_radix(flags, 16).map_err(|_| invalid("bad trace flags"))?;

        Ok(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            trace_flags,
            trace_state: None,
        })
    }

    pub fn is_sampled(&self) -> bool {
        self.trace_flags & TRACE_FLAG_SAMPLED != 0
    }
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn is_all_zero(s: &str) -> bool {
    s.bytes().all(|b| b == b'0')
}

/// Span kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

/// Span status codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCode {
    #[default]
    Unset,
    Ok,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanStatus {
    pub code: StatusCode,
    pub description: Option<String>,
}

/// An event within a span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub timestamp_nanos: u64,
}

/// A link to another span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanLink {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// A finished span as handed to the trace batcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    pub name: String,
    pub kind: SpanKind,
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub start_time_nanos: u64,
    pub end_time_nanos: u64,
    pub attributes: Vec<Attribute>,
    pub events: Vec<SpanEvent>,
    pub links: Vec<SpanLink>,
    pub status: SpanStatus,
    pub resource: Option<Resource>,
}

/// Parameters for starting a new span
#[derive(Debug, Clone, Default)]
pub struct SpanSpec {
    pub name: String,
    pub kind: SpanKind,
    /// Parent context; a new trace is started when absent
    pub parent: Option<TraceContext>,
    pub attributes: Vec<Attribute>,
    pub links: Vec<SpanLink>,
    pub start_time_nanos: Option<u64>,
}

impl SpanSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_parent(mut self, parent: TraceContext) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Detailed error information recorded on a span
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    pub error_type: Option<String>,
    pub stack_trace: Option<String>,
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub circuit_breaker_triggered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TraceContext {
        TraceContext {
            trace_id: "4bf92f3577b34da6a3ce929d0e0e4736".to_string(),
            span_id: "00f067aa0ba902b7".to_string(),
            trace_flags: 1,
            trace_state: None,
        }
    }

    #[test]
    fn test_traceparent_format() {
        assert_eq!(
            sample().to_traceparent(),
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
        );
    }

    #[test]
    fn test_traceparent_parse() {
        let ctx = TraceContext::from_traceparent(
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        )
        .unwrap();
        assert_eq!(ctx, sample());
        assert!(ctx.is_sampled());
    }

    #[test]
    fn test_traceparent_rejects_malformed_values() {
        let bad = [
            "",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7",
            "ff-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
            "00-00000000000000000000000000000000-00f067aa0ba902b7-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01",
            "00-4BF92F3577B34DA6A3CE929D0E0E4736-00f067aa0ba902b7-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01-extra",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-zz",
        ];
        for value in bad {
            assert!(
                TraceContext::from_traceparent(value).is_err(),
                "should reject {:?}",
                value
            );
        }
    }

    #[test]
    fn test_traceparent_accepts_future_version_with_extra_fields() {
        let ctx = TraceContext::from_traceparent(
            "01-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00-what-the-future",
        )
        .unwrap();
        assert!(!ctx.is_sampled());
    }
}

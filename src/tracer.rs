//! Tracer and span handles
//!
//! A [`Span`] is recorded in memory until [`Span::end`] hands the finished
//! [`SpanData`] to the trace batcher. Mutating a span after it has ended has
//! no effect.

use crate::error::TelemetryError;
use crate::models::{
    current_nanos, Attribute, ErrorInfo, Resource, SpanData, SpanEvent, SpanSpec, SpanStatus,
    StatusCode, TraceContext, TRACE_FLAG_SAMPLED,
};
use crate::provider::{timestamp_or_now, Pipeline};
use rand::Rng;
use std::sync::Arc;

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Named span producer bound to a provider
#[derive(Clone)]
pub struct Tracer {
    pipeline: Arc<Pipeline>,
    name: String,
    version: Option<String>,
    resource: Resource,
}

impl Tracer {
    pub(crate) fn new(pipeline: Arc<Pipeline>, name: &str, version: Option<&str>) -> Self {
        let resource = pipeline.scope_resource("tracer", name);
        Self {
            pipeline,
            name: name.to_string(),
            version: version.map(str::to_string),
            resource,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Start a span, continuing the parent's trace if one is given
    pub fn start_span(&self, spec: SpanSpec) -> Span {
        let (trace_id, parent_span_id, trace_flags, trace_state) = match spec.parent {
            Some(parent) => (
                parent.trace_id,
                Some(parent.span_id),
                parent.trace_flags,
                parent.trace_state,
            ),
            None => (new_trace_id(), None, TRACE_FLAG_SAMPLED, None),
        };

        let data = SpanData {
            name: spec.name,
            kind: spec.kind,
            trace_id,
            span_id: new_span_id(),
            parent_span_id,
            start_time_nanos: timestamp_or_now(spec.start_time_nanos),
            end_time_nanos: 0,
            attributes: spec.attributes,
            events: Vec::new(),
            links: spec.links,
            status: SpanStatus::default(),
            resource: None,
        };

        tracing::trace!(
            tracer = %self.name,
            span = %data.name,
            trace_id = %data.trace_id,
            "Span started"
        );

        Span {
            tracer: self.clone(),
            data,
            trace_flags,
            trace_state,
            ended: false,
        }
    }

    /// Read a W3C trace context from header pairs
    ///
    /// Header names are matched case-insensitively. Returns `None` when no
    /// valid `traceparent` is present.
    pub fn extract_context(&self, carrier: &[(String, String)]) -> Option<TraceContext> {
        let header = |name: &str| {
            carrier
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        };

        let traceparent = header(TRACEPARENT_HEADER)?;
        let mut context = match TraceContext::from_traceparent(traceparent) {
            Ok(context) => context,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring invalid traceparent header");
                return None;
            }
        };
        context.trace_state = header(TRACESTATE_HEADER)
            .map(str::trim)
            .filter(|state| !state.is_empty())
            .map(str::to_string);

        Some(context)
    }

    /// Write a trace context as W3C header pairs
    pub fn inject_context(&self, context: &TraceContext) -> Vec<(String, String)> {
        let mut headers = vec![(TRACEPARENT_HEADER.to_string(), context.to_traceparent())];
        if let Some(state) = &context.trace_state {
            headers.push((TRACESTATE_HEADER.to_string(), state.clone()));
        }
        headers
    }

    pub fn generate_correlation_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// A span in progress
pub struct Span {
    tracer: Tracer,
    data: SpanData,
    trace_flags: u8,
    trace_state: Option<String>,
    ended: bool,
}

impl Span {
    /// Context to propagate to children and downstream services
    pub fn context(&self) -> TraceContext {
        TraceContext {
            trace_id: self.data.trace_id.clone(),
            span_id: self.data.span_id.clone(),
            trace_flags: self.trace_flags,
            trace_state: self.trace_state.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn set_attributes<I>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = Attribute>,
    {
        if self.ended {
            return;
        }
        self.data.attributes.extend(attributes);
    }

    pub fn add_event(&mut self, name: impl Into<String>, attributes: Vec<Attribute>) {
        if self.ended {
            return;
        }
        self.data.events.push(SpanEvent {
            name: name.into(),
            attributes,
            timestamp_nanos: current_nanos(),
        });
    }

    /// Record an `exception` event and mark the span as failed
    pub fn record_error(&mut self, error: &ErrorInfo) {
        if self.ended {
            return;
        }

        let mut attributes = vec![Attribute::new("exception.message", error.message.as_str())];
        if let Some(error_type) = &error.error_type {
            attributes.push(Attribute::new("exception.type", error_type.as_str()));
        }
        if let Some(stack_trace) = &error.stack_trace {
            attributes.push(Attribute::new("exception.stacktrace", stack_trace.as_str()));
        }
        if let Some(fingerprint) = &error.fingerprint {
            attributes.push(Attribute::new("exception.fingerprint", fingerprint.as_str()));
        }
        if error.circuit_breaker_triggered {
            attributes.push(Attribute::new("circuit_breaker.triggered", true));
        }

        self.add_event("exception", attributes);
        self.set_status(StatusCode::Error, Some(error.message.clone()));
    }

    /// Set the span status; the description is kept only for `Error`
    pub fn set_status(&mut self, code: StatusCode, description: Option<String>) {
        if self.ended {
            return;
        }
        self.data.status = SpanStatus {
            code,
            description: description.filter(|_| code == StatusCode::Error),
        };
    }

    pub fn update_name(&mut self, name: impl Into<String>) {
        if self.ended {
            return;
        }
        self.data.name = name.into();
    }

    /// Finish the span and hand it to the trace batcher
    ///
    /// Uses the current time when `end_time_nanos` is `None`. Ending an
    /// already ended span does nothing.
    pub async fn end(&mut self, end_time_nanos: Option<u64>) -> Result<(), TelemetryError> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;

        let mut data = self.data.clone();
        data.end_time_nanos = timestamp_or_now(end_time_nanos).max(data.start_time_nanos);
        data.resource = Some(self.tracer.resource.clone());
        data.attributes
            .extend(self.tracer.pipeline.default_tags().iter().cloned());
        if let Some(version) = &self.tracer.version {
            data.attributes
                .push(Attribute::new("tracer.version", version.as_str()));
        }

        self.tracer.pipeline.submit_span(data).await
    }
}

fn new_trace_id() -> String {
    let mut rng = rand::thread_rng();
    loop {
        let id: u128 = rng.gen();
        if id != 0 {
            return format!("{:032x}", id);
        }
    }
}

fn new_span_id() -> String {
    let mut rng = rand::thread_rng();
    loop {
        let id: u64 = rng.gen();
        if id != 0 {
            return format!("{:016x}", id);
        }
    }
}

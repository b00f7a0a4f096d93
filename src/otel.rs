//! OpenTelemetry-backed implementation of the agent contract.
//!
//! Scopes are `tracing` spans bridged into OpenTelemetry through
//! `tracing-opentelemetry`:
//!
//! - Web transactions become root SERVER spans named by the request URL,
//!   with `faas.trigger` set to "http".
//! - Background transactions become root INTERNAL spans with `faas.trigger`
//!   set to "other".
//! - Segments become INTERNAL child spans of whatever span is current when
//!   they open, which is how they nest inside the enclosing transaction.
//!
//! Inbound distributed-trace headers are run through the globally configured
//! text-map propagator and re-parent the transaction span, so the exported
//! trace links to the upstream caller. Linking metadata is rendered from the
//! current span context at the moment of each call.

use crate::agent::{AgentConfig, ScopeHandle, TelemetryAgent, TransportType};
use opentelemetry::trace::{Status, TraceContextExt};
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::field::Empty;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// The production monitoring agent.
///
/// Created by [`init_telemetry`](crate::telemetry::init_telemetry); holds
/// the tracer provider for the flush-at-shutdown part of the lifecycle.
pub struct OtelAgent {
    provider: SdkTracerProvider,
    config: AgentConfig,
}

impl OtelAgent {
    pub(crate) fn new(provider: SdkTracerProvider, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Force-flush all pending telemetry.
    ///
    /// Call once per invocation in hosts that may freeze the process after
    /// the response, or once before process exit otherwise.
    pub fn force_flush(&self) {
        if let Err(e) = self.provider.force_flush() {
            tracing::warn!(error = ?e, "error flushing telemetry");
        }
    }

    /// Flush and shut the provider down. Part of process teardown.
    pub fn shutdown(&self) {
        self.force_flush();
        if let Err(e) = self.provider.shutdown() {
            tracing::warn!(error = ?e, "error shutting down telemetry");
        }
    }
}

struct OtelScope {
    span: tracing::Span,
}

impl ScopeHandle for OtelScope {
    fn accept_distributed_trace_headers(
        &self,
        _transport: TransportType,
        headers: &HashMap<String, String>,
    ) {
        if headers.is_empty() {
            return;
        }
        let parent_context =
            opentelemetry::global::get_text_map_propagator(|propagator| propagator.extract(headers));
        self.span.set_parent(parent_context);
    }

    fn notice_error(&self, error: &dyn Display) {
        self.span.set_status(Status::error(error.to_string()));
    }

    fn span(&self) -> &tracing::Span {
        &self.span
    }

    fn end(self: Box<Self>) {
        // The span closes when its last handle drops; the wrapper's clone is
        // gone by the time end() runs.
    }
}

impl TelemetryAgent for OtelAgent {
    fn start_web_transaction(&self, url: &str) -> Box<dyn ScopeHandle> {
        let span = tracing::info_span!(
            parent: None,
            "transaction",
            otel.name = Empty,
            otel.kind = Empty,
            faas.trigger = "http",
        );
        span.record("otel.name", url);
        span.record("otel.kind", "SERVER");
        Box::new(OtelScope { span })
    }

    fn start_background_transaction(&self, name: &str) -> Box<dyn ScopeHandle> {
        let span = tracing::info_span!(
            parent: None,
            "transaction",
            otel.name = Empty,
            otel.kind = Empty,
            faas.trigger = "other",
        );
        span.record("otel.name", name);
        span.record("otel.kind", "INTERNAL");
        Box::new(OtelScope { span })
    }

    fn start_segment(&self, name: &str, record_as_span: bool) -> Box<dyn ScopeHandle> {
        if !record_as_span {
            return Box::new(OtelScope {
                span: tracing::Span::none(),
            });
        }
        let span = tracing::info_span!("segment", otel.name = Empty, otel.kind = Empty);
        span.record("otel.name", name);
        span.record("otel.kind", "INTERNAL");
        Box::new(OtelScope { span })
    }

    fn current_transaction(&self) -> Option<Box<dyn ScopeHandle>> {
        let span = tracing::Span::current();
        let is_active = span.context().span().span_context().is_valid();
        is_active.then(|| Box::new(OtelScope { span }) as Box<dyn ScopeHandle>)
    }

    fn notice_error(&self, error: &dyn Display) {
        tracing::error!(error = %error, "error reported to the agent");
    }

    fn linking_metadata(&self) -> String {
        let context = tracing::Span::current().context();
        let span_ref = context.span();
        let span_context = span_ref.span_context();
        if !span_context.is_valid() {
            return String::new();
        }
        format!(
            " trace.id={} span.id={}",
            span_context.trace_id(),
            span_context.span_id()
        )
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }
}

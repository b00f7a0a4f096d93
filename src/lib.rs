//! Lightweight APM instrumentation for Azure Functions custom handlers.
//!
//! This crate wraps function handlers with monitoring scopes and correlates
//! their log output with the active trace, on top of OpenTelemetry. It is an
//! adapter layer, not a tracing system or a web framework: the host invokes
//! handlers, OpenTelemetry exports spans, and this crate sits between them.
//!
//! # Features
//!
//! - **Scope wrappers**: run any handler inside a web transaction,
//!   background transaction, or segment — transparent in values and errors,
//!   closing the scope exactly once on every exit path
//! - **Distributed-trace propagation**: inbound headers found among the
//!   handler's arguments seed the transaction's trace identity
//! - **Dual context shapes**: the same wrappers work against both host
//!   programming models (Legacy nested-logger contexts and Modern
//!   context-is-the-logger contexts), probed at extraction time
//! - **Log correlation**: every context log line can carry the current
//!   trace/span identity, installed process-wide or patched per call
//!
//! # Architecture
//!
//! - [`telemetry`]: initialization, configuration, instrumentation hook
//! - [`agent`]: the monitoring-agent contract (traits, scope handles, config)
//! - [`otel`]: the OpenTelemetry-backed agent implementation
//! - [`handler`]: scope wrappers around handlers
//! - [`extractors`]: locating context/request among handler arguments
//! - [`logs`]: log records, metadata injection, both patch strategies
//! - [`context`]: host object shapes (requests, both context models)
//! - [`app`]: minimal registration/dispatch seam for samples and tests
//!
//! # Quick start
//!
//! ```no_run
//! use functions_otel_lite::logs::decorate_context_logging;
//! use functions_otel_lite::{
//!     init_telemetry, wrap_as_web_transaction, Error, HttpRequest, HttpResponse,
//!     InvocationContext, TelemetryAgent, TelemetryConfig,
//! };
//! use std::sync::Arc;
//!
//! async fn handler(
//!     (request, context): (HttpRequest, InvocationContext),
//! ) -> Result<HttpResponse, Error> {
//!     context.log(format!("processing {}", request.url));
//!     let name = match request.query.get("name") {
//!         Some(name) => name.clone(),
//!         None if !request.text().is_empty() => request.text().to_string(),
//!         None => "world".to_string(),
//!     };
//!     Ok(HttpResponse::ok(format!("Hello, {name}!")))
//! }
//!
//! # async fn example(request: HttpRequest) -> Result<(), Error> {
//! let agent: Arc<dyn TelemetryAgent> = init_telemetry(
//!     TelemetryConfig::builder()
//!         .with_instrumentation("invocation-context-log", decorate_context_logging)
//!         .build(),
//! )?;
//!
//! let context = InvocationContext::new("inv-1", "fngreetings");
//! let response =
//!     wrap_as_web_transaction("/fngreetings", &agent, (request, context), handler).await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod app;
pub mod constants;
pub mod context;
pub mod extractors;
pub mod handler;
pub mod logger;
pub mod logs;
pub mod otel;
pub mod resource;
pub mod telemetry;

pub use agent::{
    AgentConfig, ApplicationLogging, LocalDecorating, ScopeHandle, ScopeKind, TelemetryAgent,
    TransportType,
};
pub use app::{AuthLevel, Error, FunctionApp, HttpTriggerOptions, Method};
pub use context::{HttpRequest, HttpResponse, InvocationContext, LegacyContext, LegacyLogger};
pub use extractors::{programming_model, trace_headers, ContextShape, HandlerArg, InvocationArgs};
pub use handler::{
    wrap_as_background_transaction, wrap_as_background_transaction_sync, wrap_as_segment,
    wrap_as_segment_sync, wrap_as_web_transaction, wrap_as_web_transaction_sync,
};
pub use logs::{decorate_context_logging, patch_context, LogLevel, LogRecord, LogSink, LogValue};
pub use otel::OtelAgent;
pub use resource::get_functions_resource;
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryError};

//! Telemetry initialization and agent lifecycle.
//!
//! This module is the crate's entry point:
//! - [`TelemetryConfig`]: configuration builder with environment-based
//!   defaults
//! - [`init_telemetry`]: one-time setup, returning the process-wide agent
//!
//! # Initialization flow
//!
//! 1. Text-map propagators are composed and installed globally (W3C
//!    `tracecontext` by default).
//! 2. A tracer provider is built from the configured span processors, with a
//!    simple stdout OTLP processor as the fallback, and the detected
//!    Functions resource attributes.
//! 3. The `tracing` subscriber is installed: OpenTelemetry layer, env-filter,
//!    and optionally a fmt layer (JSON when the host requests it).
//! 4. The agent is constructed with configuration read from the environment,
//!    and every registered instrumentation runs once against it — this is
//!    where process-wide patches such as
//!    [`decorate_context_logging`](crate::logs::decorate_context_logging)
//!    install themselves, before the first invocation.
//!
//! The agent is initialized once at startup and flushed once at shutdown
//! ([`OtelAgent::force_flush`] / [`OtelAgent::shutdown`]).
//!
//! # Basic usage
//!
//! ```no_run
//! use functions_otel_lite::{init_telemetry, TelemetryConfig};
//!
//! # fn main() -> Result<(), functions_otel_lite::TelemetryError> {
//! let agent = init_telemetry(TelemetryConfig::default())?;
//! # Ok(())
//! # }
//! ```
//!
//! Registering an instrumentation:
//!
//! ```no_run
//! use functions_otel_lite::logs::decorate_context_logging;
//! use functions_otel_lite::{init_telemetry, TelemetryConfig};
//!
//! # fn main() -> Result<(), functions_otel_lite::TelemetryError> {
//! let agent = init_telemetry(
//!     TelemetryConfig::builder()
//!         .with_instrumentation("invocation-context-log", |agent| {
//!             decorate_context_logging(agent)
//!         })
//!         .build(),
//! )?;
//! # Ok(())
//! # }
//! ```

use crate::agent::{AgentConfig, TelemetryAgent};
use crate::constants::env_vars;
use crate::logger::Logger;
use crate::otel::OtelAgent;
use crate::resource::get_functions_resource;
use bon::Builder;
use opentelemetry::propagation::{TextMapCompositePropagator, TextMapPropagator};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, global::set_tracer_provider, InstrumentationScope};
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{SimpleSpanProcessor, SpanProcessor, TracerProviderBuilder},
    Resource,
};
use std::borrow::Cow;
use std::{env, sync::Arc};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;

static LOGGER: Logger = Logger::const_new("telemetry");

/// Failures during telemetry initialization.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

type Instrumentation = Box<dyn FnOnce(&Arc<dyn TelemetryAgent>)>;

/// Configuration for telemetry initialization.
///
/// `TelemetryConfig::default()` covers the standard setup; use the builder
/// to add span processors, propagators, instrumentations, or overrides.
#[derive(Builder)]
pub struct TelemetryConfig {
    #[builder(field)]
    provider_builder: TracerProviderBuilder,

    #[builder(field)]
    has_processor: bool,

    #[builder(field)]
    propagators: Vec<Box<dyn TextMapPropagator + Send + Sync>>,

    #[builder(field)]
    instrumentations: Vec<(String, Instrumentation)>,

    /// Enable console output of spans and events for debugging.
    ///
    /// Adds overhead; leave disabled in production.
    #[builder(default = crate::constants::defaults::ENABLE_FMT_LAYER)]
    pub enable_fmt_layer: bool,

    /// Register the provider as the global OpenTelemetry provider.
    #[builder(default = true)]
    pub set_global_provider: bool,

    /// Custom resource attributes for all spans.
    ///
    /// Defaults to auto-detection from the Functions environment.
    pub resource: Option<Resource>,

    /// Environment variable consulted for the log level filter.
    ///
    /// Defaults to `RUST_LOG` when set, `FUNCTIONS_APM_LOG_LEVEL` otherwise.
    pub env_var_name: Option<String>,

    /// Agent configuration override.
    ///
    /// Defaults to [`AgentConfig::from_env`].
    pub agent_config: Option<AgentConfig>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<S: telemetry_config_builder::State> TelemetryConfigBuilder<S> {
    /// Add a span processor to the tracer provider.
    ///
    /// Can be called multiple times; when never called, a simple processor
    /// over the stdout OTLP exporter is installed.
    pub fn with_span_processor<T>(mut self, processor: T) -> Self
    where
        T: SpanProcessor + 'static,
    {
        self.provider_builder = self.provider_builder.with_span_processor(processor);
        self.has_processor = true;
        self
    }

    /// Add a context propagator.
    ///
    /// Multiple propagators combine into a composite. The default is the
    /// W3C `TraceContextPropagator`.
    pub fn with_propagator<T>(mut self, propagator: T) -> Self
    where
        T: TextMapPropagator + Send + Sync + 'static,
    {
        self.propagators.push(Box::new(propagator));
        self
    }

    /// Register an instrumentation to run once against the agent at init.
    ///
    /// This is the hook process-wide patches install through, named after
    /// the host module they instrument.
    pub fn with_instrumentation<F>(mut self, module: impl Into<String>, instrumentation: F) -> Self
    where
        F: FnOnce(&Arc<dyn TelemetryAgent>) + 'static,
    {
        self.instrumentations
            .push((module.into(), Box::new(instrumentation)));
        self
    }
}

/// Initialize telemetry and construct the process-wide agent.
///
/// # Errors
///
/// Fails when the global tracing subscriber cannot be installed (for
/// instance when one is already set).
pub fn init_telemetry(mut config: TelemetryConfig) -> Result<Arc<OtelAgent>, TelemetryError> {
    if config.propagators.is_empty() {
        config
            .propagators
            .push(Box::new(TraceContextPropagator::new()));
    }
    let composite_propagator = TextMapCompositePropagator::new(config.propagators);
    global::set_text_map_propagator(composite_propagator);

    // Add default span processor if none was added
    if !config.has_processor {
        let processor = SimpleSpanProcessor::new(opentelemetry_stdout::SpanExporter::default());
        config.provider_builder = config.provider_builder.with_span_processor(processor);
    }

    let resource = config.resource.unwrap_or_else(get_functions_resource);
    let provider = config.provider_builder.with_resource(resource).build();

    if config.set_global_provider {
        set_tracer_provider(provider.clone());
    }

    let env_var_name = config.env_var_name.as_deref().unwrap_or_else(|| {
        if env::var("RUST_LOG").is_ok() {
            "RUST_LOG"
        } else {
            env_vars::LOG_LEVEL
        }
    });

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_env_var(env_var_name)
        .from_env_lossy();

    let scope = InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
        .with_version(Cow::Borrowed(env!("CARGO_PKG_VERSION")))
        .build();
    let tracer = provider.tracer_with_scope(scope);

    let subscriber = tracing_subscriber::registry()
        .with(tracing_opentelemetry::OpenTelemetryLayer::new(tracer))
        .with(env_filter);

    if config.enable_fmt_layer {
        let is_json = env::var(env_vars::WORKER_LOG_FORMAT)
            .unwrap_or_default()
            .to_uppercase()
            == "JSON";

        if is_json {
            tracing::subscriber::set_global_default(
                subscriber.with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .without_time()
                        .json(),
                ),
            )?;
        } else {
            tracing::subscriber::set_global_default(
                subscriber.with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .without_time()
                        .with_ansi(false),
                ),
            )?;
        }
    } else {
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let agent_config = config.agent_config.unwrap_or_else(AgentConfig::from_env);
    let agent = Arc::new(OtelAgent::new(provider, agent_config));

    let dyn_agent: Arc<dyn TelemetryAgent> = agent.clone();
    for (module, instrumentation) in config.instrumentations {
        LOGGER.debug(format!("running instrumentation for {}", module));
        instrumentation(&dyn_agent);
    }

    Ok(agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealed_test::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_telemetry_config_defaults() {
        let config = TelemetryConfig::builder().build();
        assert!(config.set_global_provider);
        assert!(!config.has_processor);
        assert!(!config.enable_fmt_layer);
        assert!(config.agent_config.is_none());
        assert!(config.instrumentations.is_empty());
    }

    #[sealed_test]
    fn test_init_telemetry_defaults() {
        let agent = init_telemetry(TelemetryConfig::default()).unwrap();
        assert!(agent.config().application_logging.enabled);
    }

    #[sealed_test]
    fn test_init_telemetry_agent_config_override() {
        let config = TelemetryConfig::builder()
            .agent_config(AgentConfig::with_logging(false, false))
            .set_global_provider(false)
            .build();

        let agent = init_telemetry(config).unwrap();
        assert!(!agent.config().application_logging.enabled);
    }

    #[sealed_test]
    fn test_instrumentations_run_once_at_init() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        let config = TelemetryConfig::builder()
            .with_instrumentation("invocation-context-log", move |agent| {
                assert!(agent.config().application_logging.enabled);
                flag.store(true, Ordering::Relaxed);
            })
            .set_global_provider(false)
            .build();

        let _agent = init_telemetry(config).unwrap();
        assert!(ran.load(Ordering::Relaxed));
    }

    #[sealed_test]
    fn test_init_telemetry_twice_fails_on_subscriber() {
        let first = init_telemetry(
            TelemetryConfig::builder().set_global_provider(false).build(),
        );
        assert!(first.is_ok());

        let second = init_telemetry(
            TelemetryConfig::builder().set_global_provider(false).build(),
        );
        assert!(matches!(second, Err(TelemetryError::Subscriber(_))));
    }
}

//! The monitoring-agent contract consumed by the wrappers.
//!
//! The original design reached for the agent as an ambient singleton; here it
//! is an explicit, object-safe capability injected into every wrapper call.
//! The crate ships one production implementation
//! ([`OtelAgent`](crate::otel::OtelAgent)); tests substitute recording
//! implementations of the same traits.
//!
//! # Scopes
//!
//! A scope is a named, timed unit of work: a web transaction (one inbound
//! request), a background transaction (one out-of-band unit of work), or a
//! segment (a sub-operation nested inside a transaction). The agent opens
//! scopes and hands back a [`ScopeHandle`]; closing the handle is the
//! caller's responsibility — in practice the wrapper's, which guarantees
//! exactly one close on every exit path.
//!
//! # Configuration
//!
//! [`AgentConfig`] carries the application-logging flags read once from the
//! environment at initialization:
//!
//! - `FUNCTIONS_APM_APPLICATION_LOGGING_ENABLED`: master switch for log
//!   decoration (default: true)
//! - `FUNCTIONS_APM_LOCAL_DECORATING_ENABLED`: per-call decoration switch
//!   (default: true)

use crate::constants::{defaults, env_vars};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt::{self, Display};

/// The kind of scope a wrapper opens around a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Top-level scope for one inbound HTTP request.
    WebTransaction,
    /// Top-level scope for one out-of-band unit of work.
    BackgroundTransaction,
    /// Nested scope for a sub-operation inside a transaction.
    Segment,
}

impl ScopeKind {
    /// Whether this kind is a top-level transaction (web or background).
    pub fn is_transaction(&self) -> bool {
        !matches!(self, ScopeKind::Segment)
    }

    /// Whether inbound distributed-trace headers are propagated into this kind.
    ///
    /// Segments inherit their trace identity from the enclosing transaction
    /// and never accept headers of their own.
    pub fn accepts_trace_headers(&self) -> bool {
        self.is_transaction()
    }
}

impl Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::WebTransaction => write!(f, "web"),
            ScopeKind::BackgroundTransaction => write!(f, "background"),
            ScopeKind::Segment => write!(f, "segment"),
        }
    }
}

/// Transport that carried inbound distributed-trace headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    /// Plain HTTP.
    Http,
    /// HTTPS.
    Https,
    /// Anything else (queues, timers).
    Other,
}

impl Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportType::Http => write!(f, "HTTP"),
            TransportType::Https => write!(f, "HTTPS"),
            TransportType::Other => write!(f, "Other"),
        }
    }
}

/// An open scope returned by the agent's `start_*` methods.
///
/// The handle is closed exactly once: `end` consumes it, and dropping an
/// unclosed handle closes the underlying scope as a backstop.
pub trait ScopeHandle: Send + Sync {
    /// Seed this scope's trace identity from inbound transport headers.
    ///
    /// Consumed once, at scope-open time. An empty mapping is a no-op.
    fn accept_distributed_trace_headers(
        &self,
        transport: TransportType,
        headers: &HashMap<String, String>,
    );

    /// Report a failure raised by the code running inside this scope.
    fn notice_error(&self, error: &dyn Display);

    /// The span carrying this scope, used to instrument the wrapped body so
    /// nested telemetry parents correctly.
    fn span(&self) -> &tracing::Span;

    /// Close the scope.
    fn end(self: Box<Self>);
}

/// The monitoring agent: an opaque service that opens scopes, reports
/// errors, and supplies log-correlation metadata.
pub trait TelemetryAgent: Send + Sync {
    /// Open a web transaction named by the request URL.
    fn start_web_transaction(&self, url: &str) -> Box<dyn ScopeHandle>;

    /// Open a background transaction.
    fn start_background_transaction(&self, name: &str) -> Box<dyn ScopeHandle>;

    /// Open a segment nested inside the current transaction.
    ///
    /// When `record_as_span` is false the segment is timed but not recorded.
    fn start_segment(&self, name: &str, record_as_span: bool) -> Box<dyn ScopeHandle>;

    /// Handle over the currently active transaction, if any.
    ///
    /// Ending the returned handle releases the handle only; closing the
    /// underlying scope belongs to whoever opened it.
    fn current_transaction(&self) -> Option<Box<dyn ScopeHandle>>;

    /// Report an error outside any explicit scope handle.
    fn notice_error(&self, error: &dyn Display);

    /// Correlation metadata identifying the current trace/span.
    ///
    /// Fetched fresh on every call, never cached: log lines written at
    /// different points of a request must carry the identity current at
    /// write time.
    fn linking_metadata(&self) -> String;

    /// Agent configuration, read once at initialization.
    fn config(&self) -> &AgentConfig;
}

/// Agent configuration relevant to this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub application_logging: ApplicationLogging,
}

/// Application-logging feature flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationLogging {
    pub enabled: bool,
    pub local_decorating: LocalDecorating,
}

/// Per-call (local) log decoration flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalDecorating {
    pub enabled: bool,
}

impl AgentConfig {
    /// Read the configuration from the environment.
    ///
    /// Unset or unparsable variables fall back to the defaults (both flags
    /// enabled).
    pub fn from_env() -> Self {
        Self {
            application_logging: ApplicationLogging {
                enabled: env_flag(
                    env_vars::APPLICATION_LOGGING_ENABLED,
                    defaults::APPLICATION_LOGGING_ENABLED,
                ),
                local_decorating: LocalDecorating {
                    enabled: env_flag(
                        env_vars::LOCAL_DECORATING_ENABLED,
                        defaults::LOCAL_DECORATING_ENABLED,
                    ),
                },
            },
        }
    }

    /// A configuration with both logging flags set as given.
    pub fn with_logging(enabled: bool, local_decorating: bool) -> Self {
        Self {
            application_logging: ApplicationLogging {
                enabled,
                local_decorating: LocalDecorating {
                    enabled: local_decorating,
                },
            },
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::with_logging(
            defaults::APPLICATION_LOGGING_ENABLED,
            defaults::LOCAL_DECORATING_ENABLED,
        )
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name).map(|v| v.to_lowercase()).as_deref() {
        Ok("true") | Ok("1") | Ok("yes") => true,
        Ok("false") | Ok("0") | Ok("no") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_scope_kind_predicates() {
        assert!(ScopeKind::WebTransaction.is_transaction());
        assert!(ScopeKind::BackgroundTransaction.is_transaction());
        assert!(!ScopeKind::Segment.is_transaction());

        assert!(ScopeKind::WebTransaction.accepts_trace_headers());
        assert!(!ScopeKind::Segment.accepts_trace_headers());
    }

    #[test]
    fn test_transport_display() {
        assert_eq!(TransportType::Http.to_string(), "HTTP");
        assert_eq!(TransportType::Https.to_string(), "HTTPS");
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        env::remove_var(env_vars::APPLICATION_LOGGING_ENABLED);
        env::remove_var(env_vars::LOCAL_DECORATING_ENABLED);

        let config = AgentConfig::from_env();
        assert!(config.application_logging.enabled);
        assert!(config.application_logging.local_decorating.enabled);
    }

    #[test]
    #[serial]
    fn test_config_from_env_overrides() {
        env::set_var(env_vars::APPLICATION_LOGGING_ENABLED, "false");
        env::set_var(env_vars::LOCAL_DECORATING_ENABLED, "0");

        let config = AgentConfig::from_env();
        assert!(!config.application_logging.enabled);
        assert!(!config.application_logging.local_decorating.enabled);

        env::remove_var(env_vars::APPLICATION_LOGGING_ENABLED);
        env::remove_var(env_vars::LOCAL_DECORATING_ENABLED);
    }

    #[test]
    #[serial]
    fn test_config_from_env_invalid_value_falls_back() {
        env::set_var(env_vars::APPLICATION_LOGGING_ENABLED, "maybe");

        let config = AgentConfig::from_env();
        assert!(config.application_logging.enabled);

        env::remove_var(env_vars::APPLICATION_LOGGING_ENABLED);
    }
}

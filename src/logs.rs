//! Log interception and correlation-metadata injection.
//!
//! Every log line written through an invocation context can carry the
//! identity of the trace/span active at write time, so log tooling can
//! cross-reference console output with the corresponding telemetry. This
//! module owns the record model, the injection rule, and the two
//! installation strategies the two host programming models require:
//!
//! - **Process-wide decoration** (Modern contexts): installed once through
//!   the instrumentation registration hook, it rewrites every record emitted
//!   by every Modern context's severity methods ({log, trace, debug, info,
//!   warn, error}). Installation is gated by the agent's
//!   `application_logging.enabled` flag; when the flag is off the install is
//!   a no-op and a diagnostic note is emitted once.
//! - **Per-call patching** (Legacy contexts): [`patch_context`] takes a
//!   context pulled from the handler arguments and returns it with a
//!   decorating logger layered over the original, or unmodified when
//!   decoration is configured off.
//!
//! # The injection rule
//!
//! A record is an ordered argument list: an optional head message followed by
//! substitution arguments. If the head is text containing a printf-style
//! placeholder (`%o`, `%O`, `%d`, `%i`, `%f`, `%s`, `%c`), the metadata blob
//! is appended directly onto the head — trailing it after the template keeps
//! the substitution positions intact. Any other record (plain head, non-text
//! head, no head at all) gets the metadata as one extra trailing argument.
//! Injection happens at most once per log call, with metadata fetched fresh
//! from the agent each time.
//!
//! # Re-patching
//!
//! Applying [`patch_context`] twice to the same context stacks two
//! decoration layers, and a single log call then carries the metadata twice.
//! The per-call strategy ships without a re-patch guard, matching the
//! observed behavior of the design this crate implements; callers patch once
//! per context instance. The process-wide install, by contrast, is guarded
//! and re-registration is a no-op.

use crate::agent::TelemetryAgent;
use crate::constants::SUBSTITUTION_PLACEHOLDERS;
use crate::context::{LegacyContext, LegacyLogger};
use crate::logger::Logger;
use serde_json::Value as JsonValue;
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static LOGGER: Logger = Logger::const_new("logs");

/// One argument of a log call.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    /// A plain text message (the usual head).
    Text(String),
    /// Structured data passed alongside or instead of a message.
    Data(JsonValue),
}

impl From<&str> for LogValue {
    fn from(value: &str) -> Self {
        LogValue::Text(value.to_string())
    }
}

impl From<String> for LogValue {
    fn from(value: String) -> Self {
        LogValue::Text(value)
    }
}

impl From<JsonValue> for LogValue {
    fn from(value: JsonValue) -> Self {
        LogValue::Data(value)
    }
}

impl Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Text(text) => write!(f, "{}", text),
            LogValue::Data(value) => write!(f, "{}", value),
        }
    }
}

/// The ordered argument list of one log call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogRecord {
    /// Head message first (when present), substitution arguments after.
    pub args: Vec<LogValue>,
}

impl LogRecord {
    /// A record with the given head message and no further arguments.
    pub fn new(head: impl Into<LogValue>) -> Self {
        Self {
            args: vec![head.into()],
        }
    }

    /// Append a substitution argument.
    pub fn with_arg(mut self, value: impl Into<LogValue>) -> Self {
        self.args.push(value.into());
        self
    }

    /// The head message, when the record has one.
    pub fn head(&self) -> Option<&LogValue> {
        self.args.first()
    }
}

impl From<&str> for LogRecord {
    fn from(value: &str) -> Self {
        LogRecord::new(value)
    }
}

impl From<String> for LogRecord {
    fn from(value: String) -> Self {
        LogRecord::new(value)
    }
}

impl From<Vec<LogValue>> for LogRecord {
    fn from(args: Vec<LogValue>) -> Self {
        LogRecord { args }
    }
}

/// Severity of a log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Default severity of a bare `log` call.
    Log,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Legacy-model name for trace-level output.
    Verbose,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Log => "log",
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Verbose => "verbose",
        };
        write!(f, "{}", name)
    }
}

/// Destination for context log records.
///
/// The host console is the default; tests substitute recording sinks, and
/// the decoration layers wrap whatever sink sits beneath them.
pub trait LogSink: Send + Sync {
    fn write(&self, level: LogLevel, record: &LogRecord);
}

/// Sink writing to the process console, errors and warnings to stderr.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write(&self, level: LogLevel, record: &LogRecord) {
        let line = record
            .args
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>()
            .join(" ");

        match level {
            LogLevel::Warn | LogLevel::Error => eprintln!("[{}] {}", level, line),
            _ => println!("[{}] {}", level, line),
        }
    }
}

/// Whether a message head contains any printf-style substitution token.
pub fn has_substitution_placeholders(message: &str) -> bool {
    SUBSTITUTION_PLACEHOLDERS
        .iter()
        .any(|placeholder| message.contains(placeholder))
}

/// Inject correlation metadata into a record, once.
///
/// Templated heads receive the metadata inline; everything else receives it
/// as one trailing argument. Non-text heads are treated as template-free.
pub fn decorate_record(record: &mut LogRecord, metadata: &str) {
    match record.args.first_mut() {
        Some(LogValue::Text(head)) if has_substitution_placeholders(head) => {
            head.push_str(metadata);
        }
        _ => record.args.push(LogValue::Text(metadata.to_string())),
    }
}

/// Sink decorator fetching fresh metadata for every record it forwards.
pub(crate) struct DecoratingSink {
    inner: Arc<dyn LogSink>,
    agent: Arc<dyn TelemetryAgent>,
}

impl LogSink for DecoratingSink {
    fn write(&self, level: LogLevel, record: &LogRecord) {
        let mut record = record.clone();
        decorate_record(&mut record, &self.agent.linking_metadata());
        self.inner.write(level, &record);
    }
}

// Process-wide decoration state for Modern contexts. Written at most once,
// read on every log call.
static DECORATION: OnceLock<Arc<dyn TelemetryAgent>> = OnceLock::new();
static SKIP_NOTED: AtomicBool = AtomicBool::new(false);

/// Install process-wide log decoration for Modern invocation contexts.
///
/// This is the instrumentation function meant to be registered through
/// [`TelemetryConfigBuilder::with_instrumentation`](crate::telemetry::TelemetryConfigBuilder::with_instrumentation)
/// so it runs once at startup, before the first invocation. When
/// `application_logging.enabled` is off the installation is skipped and a
/// note is emitted once per process. Repeated installation is a no-op.
pub fn decorate_context_logging(agent: &Arc<dyn TelemetryAgent>) {
    if !agent.config().application_logging.enabled {
        if !SKIP_NOTED.swap(true, Ordering::Relaxed) {
            LOGGER.info(
                "application logging is not enabled; skipping invocation context log decoration",
            );
        }
        return;
    }

    if DECORATION.set(agent.clone()).is_ok() {
        LOGGER.debug("instrumenting invocation context logging");
    }
}

/// Rewrite a record through the installed process-wide decoration, if any.
pub(crate) fn apply_installed_decoration(record: &mut LogRecord) {
    if let Some(agent) = DECORATION.get() {
        decorate_record(record, &agent.linking_metadata());
    }
}

#[cfg(test)]
pub(crate) fn decoration_installed() -> bool {
    DECORATION.get().is_some()
}

/// Layer local log decoration over a Legacy context.
///
/// Returns the context unmodified when `application_logging.enabled` or
/// `application_logging.local_decorating.enabled` is off. Otherwise the
/// context's logger is replaced with one that injects metadata and delegates
/// to the original severity methods. There is no re-patch guard: applying
/// this twice stacks two decoration layers (see the module docs).
pub fn patch_context(mut context: LegacyContext, agent: &Arc<dyn TelemetryAgent>) -> LegacyContext {
    let logging = &agent.config().application_logging;
    if !logging.enabled || !logging.local_decorating.enabled {
        return context;
    }

    context.log = LegacyLogger::with_sink(Arc::new(DecoratingSink {
        inner: context.log.sink(),
        agent: agent.clone(),
    }));
    context
}

//! Host-platform object shapes consumed by the instrumentation layer.
//!
//! The host hands handlers an HTTP request and an invocation context, and the
//! context comes in two incompatible shapes depending on the programming
//! model version:
//!
//! - **Modern** ([`InvocationContext`]): the context itself is the logger —
//!   severity methods ({log, trace, debug, info, warn, error}) sit directly
//!   on it, and the request travels as its own argument.
//! - **Legacy** ([`LegacyContext`]): the request rides along nested under
//!   `req`, and logging goes through the nested [`LegacyLogger`] member
//!   (called directly for default severity, or through its
//!   error/warn/info/verbose members).
//!
//! Both shapes write through a pluggable [`LogSink`](crate::logs::LogSink)
//! (console by default) so tests can observe output and the decoration
//! layers can interpose.

use crate::logs::{self, ConsoleSink, LogLevel, LogRecord, LogSink};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// An inbound HTTP request as marshaled by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// The full text payload of the request body, empty when absent.
    pub fn text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// An outbound HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Option<String>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status: 200,
            body: None,
        }
    }
}

impl HttpResponse {
    /// A 200 response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: Some(body.into()),
        }
    }
}

/// Modern-model invocation context: the context is the logger.
#[derive(Clone)]
pub struct InvocationContext {
    pub invocation_id: String,
    pub function_name: String,
    sink: Arc<dyn LogSink>,
}

impl InvocationContext {
    pub fn new(invocation_id: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            function_name: function_name.into(),
            sink: Arc::new(ConsoleSink),
        }
    }

    /// Replace the output sink (host integrations and tests).
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    fn emit(&self, level: LogLevel, record: impl Into<LogRecord>) {
        let mut record = record.into();
        logs::apply_installed_decoration(&mut record);
        self.sink.write(level, &record);
    }

    pub fn log(&self, record: impl Into<LogRecord>) {
        self.emit(LogLevel::Log, record);
    }

    pub fn trace(&self, record: impl Into<LogRecord>) {
        self.emit(LogLevel::Trace, record);
    }

    pub fn debug(&self, record: impl Into<LogRecord>) {
        self.emit(LogLevel::Debug, record);
    }

    pub fn info(&self, record: impl Into<LogRecord>) {
        self.emit(LogLevel::Info, record);
    }

    pub fn warn(&self, record: impl Into<LogRecord>) {
        self.emit(LogLevel::Warn, record);
    }

    pub fn error(&self, record: impl Into<LogRecord>) {
        self.emit(LogLevel::Error, record);
    }
}

/// Legacy-model invocation context: nested request, nested logger.
#[derive(Clone)]
pub struct LegacyContext {
    pub invocation_id: String,
    pub req: Option<HttpRequest>,
    pub log: LegacyLogger,
}

impl LegacyContext {
    pub fn new(invocation_id: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            req: None,
            log: LegacyLogger::default(),
        }
    }

    pub fn with_request(mut self, request: HttpRequest) -> Self {
        self.req = Some(request);
        self
    }

    /// Replace the logger's output sink (host integrations and tests).
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log = LegacyLogger::with_sink(sink);
        self
    }
}

/// The Legacy context's logger member.
///
/// A direct call logs at default severity; the named methods log at theirs.
#[derive(Clone)]
pub struct LegacyLogger {
    sink: Arc<dyn LogSink>,
}

impl Default for LegacyLogger {
    fn default() -> Self {
        Self {
            sink: Arc::new(ConsoleSink),
        }
    }
}

impl LegacyLogger {
    pub(crate) fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn sink(&self) -> Arc<dyn LogSink> {
        self.sink.clone()
    }

    /// Log at the default severity (the direct-call form).
    pub fn log(&self, record: impl Into<LogRecord>) {
        self.sink.write(LogLevel::Log, &record.into());
    }

    pub fn error(&self, record: impl Into<LogRecord>) {
        self.sink.write(LogLevel::Error, &record.into());
    }

    pub fn warn(&self, record: impl Into<LogRecord>) {
        self.sink.write(LogLevel::Warn, &record.into());
    }

    pub fn info(&self, record: impl Into<LogRecord>) {
        self.sink.write(LogLevel::Info, &record.into());
    }

    pub fn verbose(&self, record: impl Into<LogRecord>) {
        self.sink.write(LogLevel::Verbose, &record.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LogValue;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<(LogLevel, LogRecord)>>,
    }

    impl LogSink for RecordingSink {
        fn write(&self, level: LogLevel, record: &LogRecord) {
            self.records.lock().unwrap().push((level, record.clone()));
        }
    }

    #[test]
    fn test_request_deserialization() {
        let request: HttpRequest = serde_json::from_str(
            r#"{
                "method": "GET",
                "url": "https://fn.example.com/api/fngreetings?name=Ada",
                "headers": {"traceparent": "00-aa-bb-01"},
                "query": {"name": "Ada"}
            }"#,
        )
        .unwrap();

        assert_eq!(request.method, "GET");
        assert_eq!(request.query.get("name").map(String::as_str), Some("Ada"));
        assert_eq!(
            request.headers.get("traceparent").map(String::as_str),
            Some("00-aa-bb-01")
        );
        assert_eq!(request.text(), "");
    }

    #[test]
    fn test_request_text_reads_body() {
        let request = HttpRequest {
            body: Some("Grace".into()),
            ..HttpRequest::default()
        };
        assert_eq!(request.text(), "Grace");
    }

    #[test]
    fn test_response_default_status() {
        let response = HttpResponse::ok("Hello, world!");
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_deref(), Some("Hello, world!"));
    }

    #[test]
    fn test_modern_context_severity_routing() {
        let sink = Arc::new(RecordingSink::default());
        let context =
            InvocationContext::new("inv-1", "fngreetings").with_sink(sink.clone());

        context.log("a");
        context.warn("b");
        context.error("c");

        let records = sink.records.lock().unwrap();
        let levels: Vec<LogLevel> = records.iter().map(|(level, _)| *level).collect();
        assert_eq!(levels, vec![LogLevel::Log, LogLevel::Warn, LogLevel::Error]);
    }

    #[test]
    fn test_legacy_logger_direct_call_uses_default_severity() {
        let sink = Arc::new(RecordingSink::default());
        let context = LegacyContext::new("inv-1").with_sink(sink.clone());

        context.log.log(LogRecord::new("head").with_arg("tail"));
        context.log.verbose("v");

        let records = sink.records.lock().unwrap();
        assert_eq!(records[0].0, LogLevel::Log);
        assert_eq!(
            records[0].1.args,
            vec![LogValue::Text("head".into()), LogValue::Text("tail".into())]
        );
        assert_eq!(records[1].0, LogLevel::Verbose);
    }
}

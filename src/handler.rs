//! Handler wrappers opening a monitoring scope around each invocation.
//!
//! This module provides the higher-order functions that run a handler inside
//! a named scope: a web transaction, a background transaction, or a segment.
//! All variants share one algorithm:
//!
//! 1. Capture the handler's argument tuple as-is (any arity the extractors
//!    support, order and count preserved).
//! 2. Open the scope. For transaction kinds, scan the arguments for inbound
//!    distributed-trace headers and seed the scope with them; segments
//!    inherit their trace identity from the enclosing transaction instead.
//! 3. Run the handler with its original arguments, instrumented by the
//!    scope's span so nested telemetry parents correctly.
//! 4. On failure, report the error to the scope — and, for transaction
//!    kinds, to the agent's global error reporter — before returning it.
//! 5. Close the scope, exactly once, on every exit path, before control
//!    returns to the caller.
//!
//! The wrapper is transparent: the handler's `Result` passes through
//! untouched in both the success and the failure case. Only telemetry side
//! effects are added.
//!
//! # Examples
//!
//! ```no_run
//! use functions_otel_lite::{
//!     init_telemetry, wrap_as_web_transaction, HttpRequest, HttpResponse,
//!     InvocationContext, TelemetryAgent, TelemetryConfig,
//! };
//! use std::sync::Arc;
//!
//! type Error = Box<dyn std::error::Error + Send + Sync>;
//!
//! async fn handler(
//!     (request, context): (HttpRequest, InvocationContext),
//! ) -> Result<HttpResponse, Error> {
//!     context.log(format!("processing {}", request.url));
//!     Ok(HttpResponse::ok("Hello, world!"))
//! }
//!
//! # async fn example() -> Result<(), Error> {
//! let agent: Arc<dyn TelemetryAgent> = init_telemetry(TelemetryConfig::default())?;
//!
//! let request = HttpRequest::default();
//! let context = InvocationContext::new("inv-1", "fngreetings");
//! let response =
//!     wrap_as_web_transaction("/fngreetings", &agent, (request, context), handler).await?;
//! # Ok(())
//! # }
//! ```

use crate::agent::{ScopeHandle, ScopeKind, TelemetryAgent, TransportType};
use crate::extractors::{self, InvocationArgs};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

/// Run an async handler inside a web transaction named by `url`.
pub async fn wrap_as_web_transaction<Args, F, Fut, R, E>(
    url: &str,
    agent: &Arc<dyn TelemetryAgent>,
    args: Args,
    handler: F,
) -> Result<R, E>
where
    Args: InvocationArgs,
    F: FnOnce(Args) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Display,
{
    run_in_scope(ScopeKind::WebTransaction, url, agent, args, handler).await
}

/// Run an async handler inside a background transaction.
pub async fn wrap_as_background_transaction<Args, F, Fut, R, E>(
    name: &str,
    agent: &Arc<dyn TelemetryAgent>,
    args: Args,
    handler: F,
) -> Result<R, E>
where
    Args: InvocationArgs,
    F: FnOnce(Args) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Display,
{
    run_in_scope(ScopeKind::BackgroundTransaction, name, agent, args, handler).await
}

/// Run an async handler inside a segment nested in the current transaction.
pub async fn wrap_as_segment<Args, F, Fut, R, E>(
    name: &str,
    agent: &Arc<dyn TelemetryAgent>,
    args: Args,
    handler: F,
) -> Result<R, E>
where
    Args: InvocationArgs,
    F: FnOnce(Args) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Display,
{
    run_in_scope(ScopeKind::Segment, name, agent, args, handler).await
}

/// Run a synchronous handler inside a web transaction named by `url`.
pub fn wrap_as_web_transaction_sync<Args, F, R, E>(
    url: &str,
    agent: &Arc<dyn TelemetryAgent>,
    args: Args,
    handler: F,
) -> Result<R, E>
where
    Args: InvocationArgs,
    F: FnOnce(Args) -> Result<R, E>,
    E: Display,
{
    run_in_scope_sync(ScopeKind::WebTransaction, url, agent, args, handler)
}

/// Run a synchronous handler inside a background transaction.
pub fn wrap_as_background_transaction_sync<Args, F, R, E>(
    name: &str,
    agent: &Arc<dyn TelemetryAgent>,
    args: Args,
    handler: F,
) -> Result<R, E>
where
    Args: InvocationArgs,
    F: FnOnce(Args) -> Result<R, E>,
    E: Display,
{
    run_in_scope_sync(ScopeKind::BackgroundTransaction, name, agent, args, handler)
}

/// Run a synchronous handler inside a segment.
pub fn wrap_as_segment_sync<Args, F, R, E>(
    name: &str,
    agent: &Arc<dyn TelemetryAgent>,
    args: Args,
    handler: F,
) -> Result<R, E>
where
    Args: InvocationArgs,
    F: FnOnce(Args) -> Result<R, E>,
    E: Display,
{
    run_in_scope_sync(ScopeKind::Segment, name, agent, args, handler)
}

fn open_scope<Args: InvocationArgs>(
    kind: ScopeKind,
    name: &str,
    agent: &Arc<dyn TelemetryAgent>,
    args: &Args,
) -> Box<dyn ScopeHandle> {
    let scope = match kind {
        ScopeKind::WebTransaction => agent.start_web_transaction(name),
        ScopeKind::BackgroundTransaction => agent.start_background_transaction(name),
        ScopeKind::Segment => agent.start_segment(name, true),
    };

    if kind.accepts_trace_headers() {
        let headers = extractors::trace_headers(args);
        scope.accept_distributed_trace_headers(TransportType::Http, &headers);
    }

    scope
}

fn report_failure<R, E: Display>(
    kind: ScopeKind,
    agent: &Arc<dyn TelemetryAgent>,
    scope: &dyn ScopeHandle,
    result: &Result<R, E>,
) {
    if let Err(error) = result {
        scope.notice_error(error);
        if kind.is_transaction() {
            agent.notice_error(error);
        }
    }
}

async fn run_in_scope<Args, F, Fut, R, E>(
    kind: ScopeKind,
    name: &str,
    agent: &Arc<dyn TelemetryAgent>,
    args: Args,
    handler: F,
) -> Result<R, E>
where
    Args: InvocationArgs,
    F: FnOnce(Args) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Display,
{
    let scope = open_scope(kind, name, agent, &args);

    let result = handler(args).instrument(scope.span().clone()).await;

    report_failure(kind, agent, scope.as_ref(), &result);
    scope.end();
    result
}

fn run_in_scope_sync<Args, F, R, E>(
    kind: ScopeKind,
    name: &str,
    agent: &Arc<dyn TelemetryAgent>,
    args: Args,
    handler: F,
) -> Result<R, E>
where
    Args: InvocationArgs,
    F: FnOnce(Args) -> Result<R, E>,
    E: Display,
{
    let scope = open_scope(kind, name, agent, &args);

    let result = scope.span().in_scope(|| handler(args));

    report_failure(kind, agent, scope.as_ref(), &result);
    scope.end();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfig;
    use crate::context::{HttpRequest, InvocationContext, LegacyContext};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    enum Event {
        Open(ScopeKind, String),
        Headers(HashMap<String, String>),
        ScopeError(String),
        GlobalError(String),
        Close,
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn push(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct RecordingAgent {
        recorder: Arc<Recorder>,
        config: AgentConfig,
    }

    impl RecordingAgent {
        fn create() -> (Arc<dyn TelemetryAgent>, Arc<Recorder>) {
            let recorder = Arc::new(Recorder::default());
            let agent = Arc::new(RecordingAgent {
                recorder: recorder.clone(),
                config: AgentConfig::default(),
            });
            (agent, recorder)
        }
    }

    struct RecordingScope {
        recorder: Arc<Recorder>,
        span: tracing::Span,
    }

    impl ScopeHandle for RecordingScope {
        fn accept_distributed_trace_headers(
            &self,
            _transport: TransportType,
            headers: &HashMap<String, String>,
        ) {
            self.recorder.push(Event::Headers(headers.clone()));
        }

        fn notice_error(&self, error: &dyn Display) {
            self.recorder.push(Event::ScopeError(error.to_string()));
        }

        fn span(&self) -> &tracing::Span {
            &self.span
        }

        fn end(self: Box<Self>) {
            self.recorder.push(Event::Close);
        }
    }

    impl TelemetryAgent for RecordingAgent {
        fn start_web_transaction(&self, url: &str) -> Box<dyn ScopeHandle> {
            self.recorder
                .push(Event::Open(ScopeKind::WebTransaction, url.to_string()));
            Box::new(RecordingScope {
                recorder: self.recorder.clone(),
                span: tracing::Span::none(),
            })
        }

        fn start_background_transaction(&self, name: &str) -> Box<dyn ScopeHandle> {
            self.recorder
                .push(Event::Open(ScopeKind::BackgroundTransaction, name.to_string()));
            Box::new(RecordingScope {
                recorder: self.recorder.clone(),
                span: tracing::Span::none(),
            })
        }

        fn start_segment(&self, name: &str, _record_as_span: bool) -> Box<dyn ScopeHandle> {
            self.recorder
                .push(Event::Open(ScopeKind::Segment, name.to_string()));
            Box::new(RecordingScope {
                recorder: self.recorder.clone(),
                span: tracing::Span::none(),
            })
        }

        fn current_transaction(&self) -> Option<Box<dyn ScopeHandle>> {
            None
        }

        fn notice_error(&self, error: &dyn Display) {
            self.recorder.push(Event::GlobalError(error.to_string()));
        }

        fn linking_metadata(&self) -> String {
            String::new()
        }

        fn config(&self) -> &AgentConfig {
            &self.config
        }
    }

    fn request_with_traceparent() -> HttpRequest {
        HttpRequest {
            headers: HashMap::from([("traceparent".to_string(), "00-aa-bb-01".to_string())]),
            ..HttpRequest::default()
        }
    }

    #[tokio::test]
    async fn test_success_passes_value_through_and_closes_once() {
        let (agent, recorder) = RecordingAgent::create();
        let args = (request_with_traceparent(), InvocationContext::new("inv-1", "fn"));

        let result: Result<String, String> =
            wrap_as_web_transaction("/fn", &agent, args, |(request, _context)| async move {
                Ok(format!("url={}", request.url))
            })
            .await;

        assert_eq!(result.unwrap(), "url=");

        let events = recorder.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                Event::Open(ScopeKind::WebTransaction, "/fn".to_string()),
                Event::Headers(HashMap::from([(
                    "traceparent".to_string(),
                    "00-aa-bb-01".to_string()
                )])),
                Event::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_reports_once_then_rethrows_unchanged() {
        let (agent, recorder) = RecordingAgent::create();
        let args = (request_with_traceparent(), InvocationContext::new("inv-1", "fn"));

        let result: Result<(), String> =
            wrap_as_web_transaction("/fn", &agent, args, |_args| async move {
                Err("database unreachable".to_string())
            })
            .await;

        assert_eq!(result.unwrap_err(), "database unreachable");

        let events = recorder.events.lock().unwrap();
        let scope_errors = events
            .iter()
            .filter(|e| matches!(e, Event::ScopeError(_)))
            .count();
        let global_errors = events
            .iter()
            .filter(|e| matches!(e, Event::GlobalError(_)))
            .count();
        let closes = events.iter().filter(|e| matches!(e, Event::Close)).count();
        assert_eq!(scope_errors, 1);
        assert_eq!(global_errors, 1);
        assert_eq!(closes, 1);
        // closure runs after error reporting
        assert_eq!(events.last(), Some(&Event::Close));
    }

    #[tokio::test]
    async fn test_segment_skips_headers_and_global_reporting() {
        let (agent, recorder) = RecordingAgent::create();
        let args = (request_with_traceparent(),);

        let result: Result<(), String> =
            wrap_as_segment("database/get_user", &agent, args, |_args| async move {
                Err("no such row".to_string())
            })
            .await;

        assert!(result.is_err());

        let events = recorder.events.lock().unwrap();
        assert!(!events.iter().any(|e| matches!(e, Event::Headers(_))));
        assert!(!events.iter().any(|e| matches!(e, Event::GlobalError(_))));
        assert_eq!(
            *events,
            vec![
                Event::Open(ScopeKind::Segment, "database/get_user".to_string()),
                Event::ScopeError("no such row".to_string()),
                Event::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_background_transaction_accepts_legacy_headers() {
        let (agent, recorder) = RecordingAgent::create();
        let context = LegacyContext::new("inv-1").with_request(request_with_traceparent());

        let result: Result<u32, String> =
            wrap_as_background_transaction("refresh-cache", &agent, (context,), |_args| async move {
                Ok(42)
            })
            .await;

        assert_eq!(result.unwrap(), 42);

        let events = recorder.events.lock().unwrap();
        assert!(matches!(
            &events[0],
            Event::Open(ScopeKind::BackgroundTransaction, name) if name == "refresh-cache"
        ));
        assert!(matches!(&events[1], Event::Headers(h) if h.contains_key("traceparent")));
    }

    #[test]
    fn test_sync_variants_share_the_algorithm() {
        let (agent, recorder) = RecordingAgent::create();
        let args = (request_with_traceparent(), InvocationContext::new("inv-1", "fn"));

        let result: Result<&str, String> =
            wrap_as_web_transaction_sync("/fn", &agent, args, |_args| Ok("done"));
        assert_eq!(result.unwrap(), "done");

        let failed: Result<(), String> =
            wrap_as_segment_sync("seg", &agent, (), |_args| Err("nope".to_string()));
        assert!(failed.is_err());

        let events = recorder.events.lock().unwrap();
        let closes = events.iter().filter(|e| matches!(e, Event::Close)).count();
        assert_eq!(closes, 2);
        assert!(!events.iter().any(|e| matches!(e, Event::GlobalError(_))));
    }

    #[tokio::test]
    async fn test_every_kind_and_outcome_opens_and_closes_once() {
        let kinds = [
            ScopeKind::WebTransaction,
            ScopeKind::BackgroundTransaction,
            ScopeKind::Segment,
        ];
        for kind in kinds {
            for fail in [false, true] {
                let (agent, recorder) = RecordingAgent::create();
                let handler = move |_args: ()| async move {
                    if fail {
                        Err("boom".to_string())
                    } else {
                        Ok(())
                    }
                };

                let result = match kind {
                    ScopeKind::WebTransaction => {
                        wrap_as_web_transaction("scope", &agent, (), handler).await
                    }
                    ScopeKind::BackgroundTransaction => {
                        wrap_as_background_transaction("scope", &agent, (), handler).await
                    }
                    ScopeKind::Segment => wrap_as_segment("scope", &agent, (), handler).await,
                };
                assert_eq!(result.is_err(), fail, "kind {kind}, fail {fail}");

                let events = recorder.events.lock().unwrap();
                let opens = events
                    .iter()
                    .filter(|e| matches!(e, Event::Open(..)))
                    .count();
                let closes = events.iter().filter(|e| matches!(e, Event::Close)).count();
                assert_eq!(opens, 1, "kind {kind}, fail {fail}");
                assert_eq!(closes, 1, "kind {kind}, fail {fail}");
            }
        }
    }

    #[tokio::test]
    async fn test_no_matching_arguments_degrades_to_empty_headers() {
        let (agent, recorder) = RecordingAgent::create();

        let result: Result<(), String> =
            wrap_as_web_transaction("/fn", &agent, (), |_args| async move { Ok(()) }).await;
        assert!(result.is_ok());

        let events = recorder.events.lock().unwrap();
        assert!(matches!(&events[1], Event::Headers(h) if h.is_empty()));
    }

    #[tokio::test]
    async fn test_arguments_forwarded_untouched() {
        let (agent, _recorder) = RecordingAgent::create();
        let request = HttpRequest {
            query: HashMap::from([("name".to_string(), "Ada".to_string())]),
            ..HttpRequest::default()
        };

        let result: Result<String, String> = wrap_as_web_transaction(
            "/fn",
            &agent,
            (request, InvocationContext::new("inv-1", "fn")),
            |(request, context)| async move {
                Ok(format!(
                    "{}:{}",
                    context.invocation_id,
                    request.query.get("name").cloned().unwrap_or_default()
                ))
            },
        )
        .await;

        assert_eq!(result.unwrap(), "inv-1:Ada");
    }
}

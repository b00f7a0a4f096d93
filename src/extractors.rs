//! Locating the context and request among handler arguments.
//!
//! Wrapped handlers keep their own signatures; the wrapper only sees the
//! argument tuple as a whole. This module scans that tuple for the
//! invocation-context-like argument and the request-like argument, probes
//! which programming-model shape the context has, and pulls the inbound
//! distributed-trace headers out of the right place for that shape:
//!
//! - **Modern** (version 4): the request travels as its own argument, and
//!   headers are read from it directly.
//! - **Legacy** (version 3): the context carries the request nested under
//!   `req`, and headers are read from there.
//!
//! Every operation here is total. A tuple with no matching argument yields
//! `None` or an empty map — instrumentation degrades, the request does not
//! break. When several arguments match, the first in positional order wins.

use crate::context::{HttpRequest, InvocationContext, LegacyContext};
use std::collections::HashMap;
use std::fmt::{self, Display};

/// The two context shapes the host can hand a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextShape {
    /// Version-3 model: nested `req`, nested logger.
    Legacy,
    /// Version-4 model: the context is the logger, the request is separate.
    Modern,
}

impl ContextShape {
    /// Programming-model version number of this shape.
    pub fn version(&self) -> u8 {
        match self {
            ContextShape::Legacy => 3,
            ContextShape::Modern => 4,
        }
    }

    /// Extract inbound trace headers using this shape's strategy.
    pub fn trace_headers<A: InvocationArgs>(&self, args: &A) -> HashMap<String, String> {
        match self {
            ContextShape::Modern => args
                .find_request()
                .map(|request| request.headers.clone())
                .unwrap_or_default(),
            ContextShape::Legacy => match args.find_context() {
                Some(ContextArg::Legacy(context)) => context
                    .req
                    .as_ref()
                    .map(|request| request.headers.clone())
                    .unwrap_or_default(),
                _ => HashMap::new(),
            },
        }
    }
}

impl Display for ContextShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextShape::Legacy => write!(f, "legacy"),
            ContextShape::Modern => write!(f, "modern"),
        }
    }
}

/// A context argument found in a handler's argument tuple.
pub enum ContextArg<'a> {
    Legacy(&'a LegacyContext),
    Modern(&'a InvocationContext),
}

impl ContextArg<'_> {
    pub fn shape(&self) -> ContextShape {
        match self {
            ContextArg::Legacy(_) => ContextShape::Legacy,
            ContextArg::Modern(_) => ContextShape::Modern,
        }
    }
}

/// Per-argument probes. Types that are neither context- nor request-like
/// implement this with the defaults.
pub trait HandlerArg {
    /// This argument viewed as an invocation context, if it is one.
    fn as_context(&self) -> Option<ContextArg<'_>> {
        None
    }

    /// This argument viewed as a request, if it carries headers —
    /// directly, or nested under a `req` member.
    fn as_request(&self) -> Option<&HttpRequest> {
        None
    }
}

impl HandlerArg for InvocationContext {
    fn as_context(&self) -> Option<ContextArg<'_>> {
        Some(ContextArg::Modern(self))
    }
}

impl HandlerArg for LegacyContext {
    fn as_context(&self) -> Option<ContextArg<'_>> {
        Some(ContextArg::Legacy(self))
    }

    fn as_request(&self) -> Option<&HttpRequest> {
        self.req.as_ref()
    }
}

impl HandlerArg for HttpRequest {
    fn as_request(&self) -> Option<&HttpRequest> {
        Some(self)
    }
}

/// A handler's full positional argument list.
///
/// Implemented for tuples of [`HandlerArg`] up to arity four, which keeps
/// the wrappers polymorphic over handler signatures. Scanning is stable:
/// the first matching argument wins.
pub trait InvocationArgs {
    fn find_context(&self) -> Option<ContextArg<'_>>;
    fn find_request(&self) -> Option<&HttpRequest>;
}

macro_rules! impl_invocation_args {
    ($($arg:ident),*) => {
        impl<$($arg: HandlerArg),*> InvocationArgs for ($($arg,)*) {
            fn find_context(&self) -> Option<ContextArg<'_>> {
                #[allow(non_snake_case)]
                let ($($arg,)*) = self;
                None $(.or_else(|| $arg.as_context()))*
            }

            fn find_request(&self) -> Option<&HttpRequest> {
                #[allow(non_snake_case)]
                let ($($arg,)*) = self;
                None $(.or_else(|| $arg.as_request()))*
            }
        }
    };
}

impl_invocation_args!();
impl_invocation_args!(A1);
impl_invocation_args!(A1, A2);
impl_invocation_args!(A1, A2, A3);
impl_invocation_args!(A1, A2, A3, A4);

/// Probe which programming-model shape the argument tuple carries.
///
/// Modern when a Modern-shaped context is found; Legacy otherwise,
/// including when no context argument exists at all.
pub fn programming_model<A: InvocationArgs>(args: &A) -> ContextShape {
    match args.find_context() {
        Some(ContextArg::Modern(_)) => ContextShape::Modern,
        _ => ContextShape::Legacy,
    }
}

/// Extract inbound distributed-trace headers from the argument tuple.
///
/// Dispatches on the detected shape; yields an empty map when nothing
/// matches.
pub fn trace_headers<A: InvocationArgs>(args: &A) -> HashMap<String, String> {
    programming_model(args).trace_headers(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    // An argument that is neither context- nor request-like.
    struct Payload;

    impl HandlerArg for Payload {}

    fn request_with(header: (&str, &str)) -> HttpRequest {
        HttpRequest {
            headers: HashMap::from([(header.0.to_string(), header.1.to_string())]),
            ..HttpRequest::default()
        }
    }

    #[test]
    fn test_shape_versions() {
        assert_eq!(ContextShape::Legacy.version(), 3);
        assert_eq!(ContextShape::Modern.version(), 4);
    }

    #[test]
    fn test_modern_headers_come_from_request_argument() {
        let args = (
            request_with(("traceparent", "x")),
            InvocationContext::new("inv-1", "fn"),
        );

        assert_eq!(programming_model(&args), ContextShape::Modern);
        assert_eq!(
            trace_headers(&args),
            HashMap::from([("traceparent".to_string(), "x".to_string())])
        );
    }

    #[test]
    fn test_legacy_headers_come_from_nested_request() {
        let context = LegacyContext::new("inv-1").with_request(request_with(("traceparent", "y")));
        let args = (context, Payload);

        assert_eq!(programming_model(&args), ContextShape::Legacy);
        assert_eq!(
            trace_headers(&args),
            HashMap::from([("traceparent".to_string(), "y".to_string())])
        );
    }

    #[test]
    fn test_no_matching_argument_yields_empty() {
        let args = (Payload, Payload);

        assert!(args.find_context().is_none());
        assert!(args.find_request().is_none());
        assert_eq!(programming_model(&args), ContextShape::Legacy);
        assert!(trace_headers(&args).is_empty());
    }

    #[test]
    fn test_legacy_context_without_request_yields_empty() {
        let args = (LegacyContext::new("inv-1"),);

        assert!(trace_headers(&args).is_empty());
    }

    #[test]
    fn test_modern_context_without_request_argument_yields_empty() {
        let args = (InvocationContext::new("inv-1", "fn"),);

        assert_eq!(programming_model(&args), ContextShape::Modern);
        assert!(trace_headers(&args).is_empty());
    }

    #[test]
    fn test_first_matching_request_wins() {
        let args = (
            InvocationContext::new("inv-1", "fn"),
            request_with(("traceparent", "first")),
            request_with(("traceparent", "second")),
        );

        assert_eq!(
            trace_headers(&args).get("traceparent").map(String::as_str),
            Some("first")
        );
    }

    #[test]
    fn test_first_matching_context_wins() {
        let first = LegacyContext::new("inv-1").with_request(request_with(("traceparent", "one")));
        let second = LegacyContext::new("inv-2").with_request(request_with(("traceparent", "two")));
        let args = (Payload, first, second);

        match args.find_context() {
            Some(ContextArg::Legacy(context)) => assert_eq!(context.invocation_id, "inv-1"),
            _ => panic!("expected a legacy context"),
        }
        assert_eq!(
            trace_headers(&args).get("traceparent").map(String::as_str),
            Some("one")
        );
    }

    #[test]
    fn test_empty_tuple() {
        let args = ();

        assert!(args.find_context().is_none());
        assert!(trace_headers(&args).is_empty());
    }
}

//! Minimal function-app registration and dispatch.
//!
//! The real trigger framework — route marshaling, bindings, auth enforcement
//! — belongs to the host and stays out of scope. This module provides just
//! the seam the samples and end-to-end tests need: register a handler under
//! a route name with its allowed methods and auth level, then invoke it with
//! a request. Each invocation gets a fresh Modern context.

use crate::context::{HttpRequest, HttpResponse, InvocationContext};
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Boxed error type handlers return, matching the wrappers' transparency.
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Handler signature stored in the registry.
pub type HttpHandler =
    Arc<dyn Fn(HttpRequest, InvocationContext) -> BoxFuture<'static, Result<HttpResponse, Error>> + Send + Sync>;

/// HTTP methods a route accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn matches(&self, method: &str) -> bool {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        method.eq_ignore_ascii_case(name)
    }
}

/// Authorization level required to invoke a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthLevel {
    #[default]
    Anonymous,
    Function,
    Admin,
}

/// Registration options for one HTTP-triggered function.
pub struct HttpTriggerOptions {
    pub methods: Vec<Method>,
    pub auth_level: AuthLevel,
    pub handler: HttpHandler,
}

impl HttpTriggerOptions {
    pub fn new<F>(methods: Vec<Method>, auth_level: AuthLevel, handler: F) -> Self
    where
        F: Fn(HttpRequest, InvocationContext) -> BoxFuture<'static, Result<HttpResponse, Error>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            methods,
            auth_level,
            handler: Arc::new(handler),
        }
    }
}

/// Registry of HTTP-triggered functions.
#[derive(Default)]
pub struct FunctionApp {
    routes: HashMap<String, HttpTriggerOptions>,
}

impl FunctionApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an HTTP-triggered function under a route name.
    pub fn http(&mut self, name: impl Into<String>, options: HttpTriggerOptions) {
        self.routes.insert(name.into(), options);
    }

    /// Invoke a registered function with a fresh invocation context.
    ///
    /// Unknown routes yield 404 and disallowed methods 405, without reaching
    /// the handler.
    pub async fn invoke(&self, name: &str, request: HttpRequest) -> Result<HttpResponse, Error> {
        let Some(route) = self.routes.get(name) else {
            return Ok(HttpResponse {
                status: 404,
                body: Some("Not found".into()),
            });
        };

        if !route.methods.iter().any(|m| m.matches(&request.method)) {
            return Ok(HttpResponse {
                status: 405,
                body: Some("Method not allowed".into()),
            });
        }

        let context = InvocationContext::new(Uuid::new_v4().to_string(), name);
        (route.handler)(request, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    fn echo_app() -> FunctionApp {
        let mut app = FunctionApp::new();
        app.http(
            "echo",
            HttpTriggerOptions::new(vec![Method::Get, Method::Post], AuthLevel::Anonymous, |request, context| {
                async move {
                    assert!(!context.invocation_id.is_empty());
                    Ok(HttpResponse::ok(format!("{} {}", request.method, request.url)))
                }
                .boxed()
            }),
        );
        app
    }

    #[tokio::test]
    async fn test_invoke_dispatches_to_handler() {
        let app = echo_app();
        let request = HttpRequest {
            method: "GET".into(),
            url: "https://fn.example.com/api/echo".into(),
            ..HttpRequest::default()
        };

        let response = app.invoke("echo", request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body.as_deref(),
            Some("GET https://fn.example.com/api/echo")
        );
    }

    #[tokio::test]
    async fn test_invoke_rejects_disallowed_method() {
        let app = echo_app();
        let request = HttpRequest {
            method: "DELETE".into(),
            ..HttpRequest::default()
        };

        let response = app.invoke("echo", request).await.unwrap();
        assert_eq!(response.status, 405);
    }

    #[tokio::test]
    async fn test_invoke_unknown_route() {
        let app = echo_app();
        let response = app.invoke("missing", HttpRequest::default()).await.unwrap();
        assert_eq!(response.status, 404);
    }
}

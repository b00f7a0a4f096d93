//! Greeting function on the Modern programming model.
//!
//! Registers an HTTP-triggered greeting handler wrapped in a web
//! transaction, with process-wide context-log decoration installed through
//! the instrumentation hook. Run with `cargo run --example greetings`.

use functions_otel_lite::logs::decorate_context_logging;
use functions_otel_lite::{
    init_telemetry, wrap_as_web_transaction, AuthLevel, Error, FunctionApp, HttpRequest,
    HttpResponse, HttpTriggerOptions, InvocationContext, LogRecord, Method, TelemetryAgent,
    TelemetryConfig,
};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;

async fn fngreetings(
    (request, context): (HttpRequest, InvocationContext),
) -> Result<HttpResponse, Error> {
    context.log(format!(
        "Http function processed request for url \"{}\"",
        request.url
    ));
    context.warn(
        LogRecord::new("Http function processed request for url \"%s\"")
            .with_arg(request.url.clone()),
    );

    let name = match request.query.get("name") {
        Some(name) => name.clone(),
        None if !request.text().is_empty() => request.text().to_string(),
        None => "world".to_string(),
    };

    Ok(HttpResponse::ok(format!("Hello, {name}!")))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    let agent = init_telemetry(
        TelemetryConfig::builder()
            .with_instrumentation("invocation-context-log", decorate_context_logging)
            .build(),
    )?;
    let wrapper_agent: Arc<dyn TelemetryAgent> = agent.clone();

    let mut app = FunctionApp::new();
    app.http("fngreetings", {
        let agent = wrapper_agent.clone();
        HttpTriggerOptions::new(
            vec![Method::Get, Method::Post],
            AuthLevel::Anonymous,
            move |request, context| {
                let agent = agent.clone();
                async move {
                    wrap_as_web_transaction("/fngreetings", &agent, (request, context), fngreetings)
                        .await
                }
                .boxed()
            },
        )
    });

    let request = HttpRequest {
        method: "GET".into(),
        url: "https://fn.example.com/api/fngreetings?name=Ada".into(),
        query: HashMap::from([("name".to_string(), "Ada".to_string())]),
        ..HttpRequest::default()
    };
    let response = app.invoke("fngreetings", request).await?;
    println!("{} {}", response.status, response.body.unwrap_or_default());

    let posted = HttpRequest {
        method: "POST".into(),
        url: "https://fn.example.com/api/fngreetings".into(),
        body: Some("Grace".into()),
        ..HttpRequest::default()
    };
    let response = app.invoke("fngreetings", posted).await?;
    println!("{} {}", response.status, response.body.unwrap_or_default());

    // manual decoration of a plain console line
    println!("processed greetings{}", wrapper_agent.linking_metadata());

    agent.force_flush();
    Ok(())
}

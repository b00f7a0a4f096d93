//! Sample function on the Legacy programming model.
//!
//! Patches the context per call, dispatches GET/POST through segment-wrapped
//! data access (an in-memory user store standing in for a database), and
//! rejects other methods. Run with `cargo run --example sample_legacy`.

use functions_otel_lite::{
    init_telemetry, patch_context, wrap_as_segment, wrap_as_web_transaction, Error, HttpRequest,
    HttpResponse, LegacyContext, TelemetryAgent, TelemetryConfig,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct UserStore {
    users: Mutex<HashMap<u32, String>>,
    next_id: Mutex<u32>,
}

impl UserStore {
    async fn get_user(&self, id: u32) -> Result<Option<String>, Error> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn create_user(&self, name: String) -> Result<u32, Error> {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let id = *next_id;
        self.users.lock().unwrap().insert(id, name);
        Ok(id)
    }
}

async fn handle(
    (context,): (LegacyContext,),
    agent: Arc<dyn TelemetryAgent>,
    store: Arc<UserStore>,
) -> Result<HttpResponse, Error> {
    let context = patch_context(context, &agent);

    context.log.info("HTTP trigger function processed a request.");
    context.log.verbose("HTTP trigger function processed a request.");

    let request = context.req.clone().unwrap_or_default();
    match request.method.as_str() {
        "GET" => {
            let id: u32 = request
                .query
                .get("id")
                .and_then(|id| id.parse().ok())
                .unwrap_or_default();
            if id == 0 {
                return Ok(HttpResponse {
                    status: 400,
                    body: Some("User id is required".into()),
                });
            }

            let user = wrap_as_segment("database/get_user", &agent, (), |_args| async {
                store.get_user(id).await
            })
            .await?;

            Ok(match user {
                Some(name) => HttpResponse::ok(name),
                None => HttpResponse {
                    status: 404,
                    body: Some("Not found".into()),
                },
            })
        }
        "POST" => {
            let name = request.text().to_string();
            let id = wrap_as_segment("database/create_user", &agent, (), |_args| async {
                store.create_user(name).await
            })
            .await?;

            Ok(HttpResponse {
                status: 201,
                body: Some(id.to_string()),
            })
        }
        _ => Ok(HttpResponse {
            status: 405,
            body: Some("Method not allowed".into()),
        }),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    let agent = init_telemetry(TelemetryConfig::default())?;
    let wrapper_agent: Arc<dyn TelemetryAgent> = agent.clone();
    let store = Arc::new(UserStore::default());

    let created = {
        let context = LegacyContext::new("inv-1").with_request(HttpRequest {
            method: "POST".into(),
            body: Some("Ada".into()),
            ..HttpRequest::default()
        });
        let (agent, store) = (wrapper_agent.clone(), store.clone());
        wrap_as_web_transaction("/fnsamplebase", &wrapper_agent, (context,), |args| {
            handle(args, agent, store)
        })
        .await?
    };
    println!("{} {}", created.status, created.body.clone().unwrap_or_default());

    let fetched = {
        let context = LegacyContext::new("inv-2").with_request(HttpRequest {
            method: "GET".into(),
            query: HashMap::from([("id".to_string(), created.body.unwrap_or_default())]),
            ..HttpRequest::default()
        });
        let (agent, store) = (wrapper_agent.clone(), store.clone());
        wrap_as_web_transaction("/fnsamplebase", &wrapper_agent, (context,), |args| {
            handle(args, agent, store)
        })
        .await?
    };
    println!("{} {}", fetched.status, fetched.body.unwrap_or_default());

    agent.force_flush();
    Ok(())
}

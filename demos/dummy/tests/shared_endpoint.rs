mod common;

use commandable_core::{ConfigParams, ErrorDescription};
use commandable_example_dummy::{
    DummyClient, DummyCommandableHttpClient, DummyCommandableHttpService, DummyCommands,
    DummyController, DummyRestClient, DummyRestService,
};
use commandable_server::{
    AboutRestService, BasicAuthorizer, HeartbeatRestService, HttpEndpoint, Method, Principal,
    Reply, RestController, RestService, ServiceRoutes, StatusRestService, handler, middleware,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Signs in whoever names themselves in `x-user`.
#[derive(Default)]
struct Secret {
    served: Arc<AtomicUsize>,
}

impl RestController for Secret {
    fn register(&self, routes: &mut ServiceRoutes<'_>) {
        routes.register_interceptor(
            "",
            middleware(|mut req, next| async move {
                if let Some(name) = req.header("x-user").map(str::to_string) {
                    req.set_user(Principal::new(name));
                }
                next.run(req).await
            }),
        );
        let served = self.served.clone();
        routes.register_route_with_auth(
            Method::GET,
            "/secret",
            BasicAuthorizer::signed(),
            handler(move |_req| {
                served.fetch_add(1, Ordering::SeqCst);
                async { Ok(Reply::result(json!("hidden"))) }
            }),
        );
        routes.register_route(
            Method::GET,
            "/public",
            handler(|_req| async { Ok(Reply::result(json!("visible"))) }),
        );
    }

    fn default_base_route(&self) -> Option<&str> {
        Some("extra")
    }
}

#[tokio::test]
async fn services_share_one_endpoint() {
    let port = 3220;
    let endpoint = Arc::new(HttpEndpoint::from_config(&common::local_config(port)));
    let controller = Arc::new(DummyController::new());
    let commands = DummyCommands::new(controller.clone()).unwrap();

    let empty = ConfigParams::new();
    let commandable =
        DummyCommandableHttpService::with_endpoint(endpoint.clone(), &empty, &commands);
    let rest = DummyRestService::with_endpoint(
        endpoint.clone(),
        &ConfigParams::from_tuples([("base_route", "api/v1")]),
        controller,
    );
    let _heartbeat = RestService::with_endpoint(
        endpoint.clone(),
        &ConfigParams::new(),
        Arc::new(HeartbeatRestService::default()),
    );
    let info = ConfigParams::from_tuples([
        ("info.name", "dummy"),
        ("info.context_id", "ctx-1"),
        ("components.store", "memory"),
    ]);
    let status = Arc::new(StatusRestService::from_config(&info));
    let _status = RestService::with_endpoint(endpoint.clone(), &ConfigParams::new(), status);
    let about = Arc::new(AboutRestService::from_config(&info));
    let _about = RestService::with_endpoint(endpoint.clone(), &ConfigParams::new(), about);

    // Services on a shared endpoint leave opening to its owner.
    rest.open(None).await.unwrap();
    assert!(!endpoint.is_open());
    endpoint.open(None).await.unwrap();
    assert!(commandable.service().is_open());

    let commandable_client = DummyCommandableHttpClient::new(&common::local_config(port));
    commandable_client.open(None).await.unwrap();
    let mut rest_config = common::local_config(port);
    rest_config.set("base_route", "api/v1");
    let rest_client = DummyRestClient::new(&rest_config);
    rest_client.open(None).await.unwrap();

    // Both transports reach the same controller.
    let created = commandable_client
        .create_dummy(None, commandable_example_dummy::Dummy::new("shared", "one"))
        .await
        .unwrap()
        .unwrap();
    let id = created.id.unwrap();
    let found = rest_client.get_dummy_by_id(None, &id).await.unwrap().unwrap();
    assert_eq!(found.key, "shared");

    let http = reqwest::Client::new();
    let base = format!("http://localhost:{port}");

    let heartbeat: Value =
        http.get(format!("{base}/heartbeat")).send().await.unwrap().json().await.unwrap();
    let time = heartbeat.as_str().unwrap();
    assert!(time.contains('T') && time.ends_with('Z'));

    let status: Value =
        http.get(format!("{base}/status")).send().await.unwrap().json().await.unwrap();
    assert_eq!(status["id"], "ctx-1");
    assert_eq!(status["name"], "dummy");
    assert_eq!(status["components"], json!(["memory"]));
    assert!(status["uptime_ms"].as_i64().unwrap() >= 0);

    let about: Value = http
        .get(format!("{base}/about"))
        .header("x-forwarded-for", "10.1.1.1, 10.0.0.2")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(about["server"]["name"], "dummy");
    assert_eq!(about["server"]["protocol"], "http");
    assert_eq!(about["server"]["host"], format!("localhost:{port}"));
    assert_eq!(about["server"]["url"], "/about");
    assert_eq!(about["server"]["ip"], "10.1.1.1");
    assert_eq!(about["client"]["user"], Value::Null);

    // Routes added after open are served immediately.
    let response = http.get(format!("{base}/extra/public")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let secret = Arc::new(Secret::default());
    let served = secret.served.clone();
    let extra = RestService::with_endpoint(endpoint.clone(), &ConfigParams::new(), secret);
    let response = http.get(format!("{base}/extra/public")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = http.get(format!("{base}/extra/secret")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let error: ErrorDescription = response.json().await.unwrap();
    assert_eq!(error.code, "NOT_SIGNED");
    assert_eq!(served.load(Ordering::SeqCst), 0);

    let response = http
        .get(format!("{base}/extra/secret"))
        .header("x-user", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!("hidden"));
    assert_eq!(served.load(Ordering::SeqCst), 1);

    extra.detach();
    let response = http.get(format!("{base}/extra/public")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // Closing a service that does not own the endpoint leaves it running.
    rest.close(None).await;
    assert!(endpoint.is_open());

    commandable_client.close(None).await;
    rest_client.close(None).await;
    endpoint.close(None).await;
    assert!(!endpoint.is_open());
}

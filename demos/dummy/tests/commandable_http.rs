mod common;

use commandable_client::ClientOptions;
use commandable_core::{CorrelationIdPlace, ErrorDescription};
use commandable_example_dummy::{
    DummyClient, DummyCommandableHttpClient, DummyCommandableHttpService, DummyCommands,
    DummyController,
};
use common::local_config;
use serde_json::json;
use std::sync::Arc;

async fn serve(port: u16) -> DummyCommandableHttpService {
    let commands = DummyCommands::new(Arc::new(DummyController::new())).unwrap();
    let service = DummyCommandableHttpService::new(&local_config(port), &commands);
    service.open(None).await.unwrap();
    service
}

#[tokio::test]
async fn commandable_client_scenarios() {
    let service = serve(3000).await;
    let client = DummyCommandableHttpClient::new(&local_config(3000));
    client.open(None).await.unwrap();

    common::crud_operations(&client).await;
    common::update_missing(&client).await;
    common::exception_propagation(&client).await;
    common::ping_and_correlation(&client).await;

    assert_eq!(service.counters().count("dummy.create_dummy.exec_count"), 2);
    assert_eq!(client.inner().rest().counters().count("dummy.create_dummy.call_count"), 2);

    client.close(None).await;
    service.close(None).await;
}

#[tokio::test]
async fn correlation_id_travels_in_headers() {
    let service = serve(3201).await;
    let mut config = local_config(3201);
    config.set("options.correlation_id_place", "headers");
    let client = DummyCommandableHttpClient::new(&config);
    assert_eq!(
        client.inner().rest().options().correlation_id_place,
        CorrelationIdPlace::Headers
    );
    assert_eq!(ClientOptions::from_config(&config).retries, 3);
    client.open(None).await.unwrap();

    assert_eq!(client.check_correlation_id(Some("in-header")).await.unwrap(), "in-header");

    client.close(None).await;
    service.close(None).await;
}

#[tokio::test]
async fn raw_command_requests() {
    let service = serve(3202).await;
    let http = reqwest::Client::new();
    let url = |command: &str| format!("http://localhost:3202/dummy/{command}");

    // Required `dummy` is missing.
    let response = http.post(url("create_dummy")).json(&json!({})).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let error: ErrorDescription = response.json().await.unwrap();
    assert_eq!(error.code, "INVALID_DATA");

    let response = http
        .post(url("create_dummy_without_validation"))
        .json(&json!({"anything": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = http
        .post(url("raise_commandset_error"))
        .json(&json!({"dummy": {"key": "k"}, "correlation_id": "from-body"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);
    let error: ErrorDescription = response.json().await.unwrap();
    assert_eq!(error.code, "COMMANDSET_ERROR");
    assert_eq!(error.correlation_id.as_deref(), Some("from-body"));

    let response = http.post(url("no_such_command")).json(&json!({})).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = http.get(url("ping_dummy")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 405);

    let response = http.post(url("create_dummy")).body("{not json").send().await.unwrap();
    assert_eq!(response.status().as_u16(), 400);

    service.close(None).await;
}

#[tokio::test]
async fn failed_commands_are_counted() {
    let service = serve(3203).await;
    let client = DummyCommandableHttpClient::new(&local_config(3203));
    client.open(None).await.unwrap();

    client.raise_exception(None).await.unwrap_err();
    assert_eq!(service.counters().count("dummy.raise_exception.exec_errors"), 1);
    assert_eq!(client.inner().rest().counters().count("dummy.raise_exception.call_errors"), 1);

    client.close(None).await;
    service.close(None).await;
}

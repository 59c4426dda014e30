//! Pact contract tests for the connection management API
//!
//! These tests define the contract between the Tenant Sync Controller and the
//! connection API. They drive the connection synchronizer over the real HTTP
//! client against a Pact mock server.

#[cfg(test)]
mod common;

use std::time::Duration;

use common::{init_rustls, ready_state, KAFKA_HOST};
use pact_consumer::prelude::*;
use serde_json::{json, Value};
use tenant_sync_controller::client::RestResourceClient;
use tenant_sync_controller::controller::reconciler::template::default_connection;
use tenant_sync_controller::controller::reconciler::{apply_credentials, reconcile_connection};
use tenant_sync_controller::credentials::ReadyCredentials;

const CONNECTION_PATH: &str = "/api/2/connections/hono-kafka-connection-for-acme";
// base64("devops:s3cr3t")
const AUTHORIZATION: &str = "Basic ZGV2b3BzOnMzY3IzdA==";

/// mock_server.url() returns a Url struct - convert to string and strip trailing slash
fn base_url(mut url: String) -> String {
    if url.ends_with('/') {
        url.pop();
    }
    url
}

fn http_client() -> RestResourceClient {
    RestResourceClient::new(Duration::from_secs(5), false).expect("Failed to create HTTP client")
}

fn merged(document: Value, credentials: &ReadyCredentials<'_>) -> Value {
    let Value::Object(mut map) = document else {
        panic!("connection document must be an object");
    };
    apply_credentials(&mut map, credentials, KAFKA_HOST).expect("Failed to apply credentials");
    Value::Object(map)
}

#[tokio::test]
async fn test_update_existing_connection_contract() {
    init_rustls();
    let state = ready_state();
    let credentials = state.ready().expect("state is ready");

    let existing = json!({
        "id": "hono-kafka-connection-for-acme",
        "name": "[Hono/Kafka] acme",
        "connectionType": "kafka",
        "connectionStatus": "open",
        "uri": "ssl://old-kafka:9092",
        "validateCertificates": false,
        "sources": [],
        "targets": [],
        "mappingDefinitions": {
            "status": { "mappingEngine": "JavaScript" }
        }
    });
    let expected = merged(existing.clone(), &credentials);

    let mut pact_builder = PactBuilder::new("Tenant-Sync-Controller", "Connection-API");
    pact_builder
        .interaction("get an existing connection", "", |mut i| {
            i.given("connection hono-kafka-connection-for-acme exists");
            i.request
                .method("GET")
                .path(CONNECTION_PATH.to_string())
                .header("authorization", AUTHORIZATION);
            i.response
                .status(200)
                .header("content-type", "application/json")
                .json_body(existing.clone());
            i
        })
        .interaction("update an existing connection", "", |mut i| {
            i.given("connection hono-kafka-connection-for-acme exists");
            i.request
                .method("PUT")
                .path(CONNECTION_PATH.to_string())
                .header("authorization", AUTHORIZATION)
                .header("content-type", "application/json")
                .json_body(expected.clone());
            i.response.status(204);
            i
        });

    let mock_server = pact_builder.start_mock_server(None, None);
    let needs_retry = reconcile_connection(
        &http_client(),
        &base_url(mock_server.url().to_string()),
        KAFKA_HOST,
        &credentials,
    )
    .await;

    assert!(!needs_retry);
}

#[tokio::test]
async fn test_create_missing_connection_contract() {
    init_rustls();
    let state = ready_state();
    let credentials = state.ready().expect("state is ready");
    let expected = merged(Value::Object(default_connection("acme", KAFKA_HOST)), &credentials);

    let mut pact_builder = PactBuilder::new("Tenant-Sync-Controller", "Connection-API");
    pact_builder
        .interaction("get a connection that does not exist", "", |mut i| {
            i.given("connection hono-kafka-connection-for-acme does not exist");
            i.request
                .method("GET")
                .path(CONNECTION_PATH.to_string())
                .header("authorization", AUTHORIZATION);
            i.response.status(404);
            i
        })
        .interaction("create the connection from the default template", "", |mut i| {
            i.given("connection hono-kafka-connection-for-acme does not exist");
            i.request
                .method("PUT")
                .path(CONNECTION_PATH.to_string())
                .header("authorization", AUTHORIZATION)
                .header("content-type", "application/json")
                .json_body(expected.clone());
            i.response
                .status(201)
                .header("content-type", "application/json")
                .json_body(json!({ "id": "hono-kafka-connection-for-acme" }));
            i
        });

    let mock_server = pact_builder.start_mock_server(None, None);
    let needs_retry = reconcile_connection(
        &http_client(),
        &base_url(mock_server.url().to_string()),
        KAFKA_HOST,
        &credentials,
    )
    .await;

    assert!(!needs_retry);
}

#[tokio::test]
async fn test_unauthorized_get_requests_retry_contract() {
    init_rustls();
    let state = ready_state();
    let credentials = state.ready().expect("state is ready");

    let mut pact_builder = PactBuilder::new("Tenant-Sync-Controller", "Connection-API");
    pact_builder.interaction("get a connection with rejected credentials", "", |mut i| {
        i.given("the devops password has been rotated");
        i.request
            .method("GET")
            .path(CONNECTION_PATH.to_string())
            .header("authorization", AUTHORIZATION);
        i.response
            .status(401)
            .header("content-type", "application/json")
            .json_body(json!({
                "status": 401,
                "error": "gateway:authentication.failed"
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let needs_retry = reconcile_connection(
        &http_client(),
        &base_url(mock_server.url().to_string()),
        KAFKA_HOST,
        &credentials,
    )
    .await;

    assert!(needs_retry);
}

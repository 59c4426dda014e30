//! Pact contract tests for the tenant registry API
//!
//! These tests define the contract between the Tenant Sync Controller and the
//! device registry's tenant endpoint. They drive the tenant registrar over
//! the real HTTP client against a Pact mock server.

#[cfg(test)]
mod common;

use std::time::Duration;

use common::init_rustls;
use pact_consumer::prelude::*;
use serde_json::json;
use tenant_sync_controller::client::RestResourceClient;
use tenant_sync_controller::controller::reconciler::reconcile_tenant;

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

#[tokio::test]
async fn test_create_tenant_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Tenant-Sync-Controller", "Device-Registry");

    pact_builder.interaction("create a new tenant", "", |mut i| {
        i.given("tenant acme does not exist");
        i.request
            .method("POST")
            .path("/v1/tenants/acme".to_string())
            .header("content-type", "application/json")
            .json_body(json!({}));
        i.response.status(201);
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let needs_retry =
        reconcile_tenant(&http_client(), &base_url(mock_server.url().to_string()), "acme").await;

    assert!(!needs_retry);
}

#[tokio::test]
async fn test_update_existing_tenant_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Tenant-Sync-Controller", "Device-Registry");

    pact_builder
        .interaction("create a tenant that already exists", "", |mut i| {
            i.given("tenant acme exists");
            i.request
                .method("POST")
                .path("/v1/tenants/acme".to_string())
                .header("content-type", "application/json")
                .json_body(json!({}));
            i.response
                .status(409)
                .header("content-type", "application/json")
                .json_body(json!({ "error": "tenant with ID [acme] already exists" }));
            i
        })
        .interaction("update an existing tenant", "", |mut i| {
            i.given("tenant acme exists");
            i.request
                .method("PUT")
                .path("/v1/tenants/acme".to_string())
                .header("content-type", "application/json")
                .json_body(json!({}));
            i.response.status(204);
            i
        });

    let mock_server = pact_builder.start_mock_server(None, None);
    let needs_retry =
        reconcile_tenant(&http_client(), &base_url(mock_server.url().to_string()), "acme").await;

    assert!(!needs_retry);
}

#[tokio::test]
async fn test_registry_error_requests_retry_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Tenant-Sync-Controller", "Device-Registry");

    pact_builder.interaction("create a tenant while the registry is unavailable", "", |mut i| {
        i.given("the registry is unavailable");
        i.request
            .method("POST")
            .path("/v1/tenants/acme".to_string())
            .header("content-type", "application/json")
            .json_body(json!({}));
        i.response
            .status(503)
            .header("content-type", "application/json")
            .json_body(json!({ "error": "service unavailable" }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let needs_retry =
        reconcile_tenant(&http_client(), &base_url(mock_server.url().to_string()), "acme").await;

    assert!(needs_retry);
}

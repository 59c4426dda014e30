//! Common test utilities
//!
//! Provides rustls setup for the Pact tests, generated TLS key pairs, and
//! an in-memory stand-in for the tenant registry and connection API.

#![allow(dead_code, reason = "each test crate uses a different subset")]

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, Once};

use async_trait::async_trait;
use serde_json::Value;
use tenant_sync_controller::client::{
    ClientError, Method, ResourceClient, ResourceRequest, ResourceResponse,
};
use tenant_sync_controller::config::Endpoints;
use tenant_sync_controller::credentials::CompositeCredentialState;
use tenant_sync_controller::runtime::Selectors;
use tenant_sync_controller::sources::{SourceEvent, SourceKind, SourceSnapshot};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // We use ring as the crypto provider (matches main application)
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

pub const TENANT: &str = "acme";
pub const SHARED_SECRET: &str = "s3cr3t";
pub const CA_PEM: &str = "-----BEGIN CERTIFICATE-----\nY2E=\n-----END CERTIFICATE-----\n";
pub const REGISTRY_HOST: &str = "http://registry:8080";
pub const DITTO_HOST: &str = "http://ditto:8080";
pub const KAFKA_HOST: &str = "kafka:9092";

pub fn endpoints() -> Endpoints {
    Endpoints {
        registry_host: REGISTRY_HOST.to_string(),
        ditto_host: DITTO_HOST.to_string(),
        kafka_host: KAFKA_HOST.to_string(),
    }
}

pub fn selectors() -> Selectors {
    Selectors {
        tls_key: "tls.key".to_string(),
        tls_crt: "tls.crt".to_string(),
        ca: "ca.crt".to_string(),
        shared_secret: "devops-password".to_string(),
        tenant: "tenant".to_string(),
    }
}

/// TLS snapshot with a freshly generated self-signed key pair
pub fn tls_snapshot() -> SourceSnapshot {
    let generated = rcgen::generate_simple_self_signed(vec!["device.example".to_string()])
        .expect("Failed to generate key pair");
    SourceSnapshot::new("dt4mob/ditto-kafka-tls")
        .with_entry("tls.crt", generated.cert.pem())
        .with_entry("tls.key", generated.key_pair.serialize_pem())
}

pub fn ca_snapshot() -> SourceSnapshot {
    SourceSnapshot::new("dt4mob/ditto-kafka-ca").with_entry("ca.crt", CA_PEM)
}

pub fn devops_snapshot() -> SourceSnapshot {
    SourceSnapshot::new("dt4mob/ditto-devops").with_entry("devops-password", SHARED_SECRET)
}

pub fn tenant_snapshot() -> SourceSnapshot {
    SourceSnapshot::new("dt4mob/tenant").with_entry("tenant", TENANT)
}

/// One event per facet, in source order
pub fn facet_events() -> Vec<SourceEvent> {
    vec![
        SourceEvent {
            kind: SourceKind::Tls,
            snapshot: tls_snapshot(),
        },
        SourceEvent {
            kind: SourceKind::CertificateAuthority,
            snapshot: ca_snapshot(),
        },
        SourceEvent {
            kind: SourceKind::SharedSecret,
            snapshot: devops_snapshot(),
        },
        SourceEvent {
            kind: SourceKind::Tenant,
            snapshot: tenant_snapshot(),
        },
    ]
}

/// State with every facet populated
pub fn ready_state() -> CompositeCredentialState {
    let mut state = CompositeCredentialState::new();
    state
        .set_key_pair(&tls_snapshot(), "tls.key", "tls.crt")
        .expect("valid key pair");
    state
        .set_ca_certificate(&ca_snapshot(), "ca.crt")
        .expect("valid CA");
    state
        .set_shared_secret(&devops_snapshot(), "devops-password")
        .expect("valid secret");
    state
        .set_tenant_id(&tenant_snapshot(), "tenant")
        .expect("valid tenant");
    state
}

/// A request as seen by the fake downstream, with the response it got
#[derive(Debug, Clone)]
pub struct Exchange {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub status: Option<u16>,
}

/// How the fake downstream answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Behave like the real APIs
    Healthy,
    /// Answer every request with this status
    Status(u16),
    /// Fail every request with a timeout
    Timeout,
}

#[derive(Debug, Default)]
struct Downstream {
    tenants: HashSet<String>,
    connections: HashMap<String, Value>,
    /// Raw body returned for a connection GET, overriding `connections`
    raw_connection_body: Option<String>,
}

/// In-memory tenant registry and connection API
#[derive(Debug)]
pub struct FakeDownstream {
    behavior: Mutex<Behavior>,
    tenant_behavior: Mutex<Option<Behavior>>,
    connection_put_behavior: Mutex<Option<Behavior>>,
    downstream: Mutex<Downstream>,
    exchanges: Mutex<Vec<Exchange>>,
}

impl Default for FakeDownstream {
    fn default() -> Self {
        Self::new(Behavior::Healthy)
    }
}

impl FakeDownstream {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            tenant_behavior: Mutex::new(None),
            connection_put_behavior: Mutex::new(None),
            downstream: Mutex::new(Downstream::default()),
            exchanges: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Override the behavior of the tenant registry only
    pub fn set_tenant_behavior(&self, behavior: Behavior) {
        *self.tenant_behavior.lock().unwrap() = Some(behavior);
    }

    /// Override the behavior of connection updates only, reads stay healthy
    pub fn set_connection_put_behavior(&self, behavior: Behavior) {
        *self.connection_put_behavior.lock().unwrap() = Some(behavior);
    }

    pub fn add_tenant(&self, tenant: &str) {
        self.downstream
            .lock()
            .unwrap()
            .tenants
            .insert(tenant.to_string());
    }

    pub fn put_connection(&self, id: &str, connection: Value) {
        self.downstream
            .lock()
            .unwrap()
            .connections
            .insert(id.to_string(), connection);
    }

    pub fn set_raw_connection_body(&self, body: &str) {
        self.downstream.lock().unwrap().raw_connection_body = Some(body.to_string());
    }

    pub fn connection(&self, id: &str) -> Option<Value> {
        self.downstream.lock().unwrap().connections.get(id).cloned()
    }

    pub fn has_tenant(&self, tenant: &str) -> bool {
        self.downstream.lock().unwrap().tenants.contains(tenant)
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.exchanges.lock().unwrap().clone()
    }

    pub fn clear_exchanges(&self) {
        self.exchanges.lock().unwrap().clear();
    }

    /// `(method, status)` of every exchange so far
    pub fn trace(&self) -> Vec<(Method, Option<u16>)> {
        self.exchanges()
            .iter()
            .map(|exchange| (exchange.method, exchange.status))
            .collect()
    }

    fn answer(&self, request: &ResourceRequest) -> Result<ResourceResponse, ClientError> {
        let is_tenant = request.url.contains("/v1/tenants/");
        let is_connection_put = !is_tenant && request.method == Method::Put;
        let behavior = match (
            *self.tenant_behavior.lock().unwrap(),
            *self.connection_put_behavior.lock().unwrap(),
        ) {
            (Some(behavior), _) if is_tenant => behavior,
            (_, Some(behavior)) if is_connection_put => behavior,
            _ => *self.behavior.lock().unwrap(),
        };

        match behavior {
            Behavior::Status(status) => return Ok(ResourceResponse::new(status, "boom")),
            Behavior::Timeout => {
                return Err(ClientError::Timeout {
                    method: request.method,
                    url: request.url.clone(),
                })
            }
            Behavior::Healthy => {}
        }

        let id = request
            .url
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let mut downstream = self.downstream.lock().unwrap();

        let response = if is_tenant {
            match request.method {
                Method::Post if downstream.tenants.contains(&id) => {
                    ResourceResponse::new(409, "tenant already exists")
                }
                Method::Post => {
                    downstream.tenants.insert(id);
                    ResourceResponse::new(201, "")
                }
                Method::Put if downstream.tenants.contains(&id) => ResourceResponse::new(204, ""),
                _ => ResourceResponse::new(404, ""),
            }
        } else {
            match request.method {
                Method::Get => {
                    if let Some(raw) = &downstream.raw_connection_body {
                        ResourceResponse::new(200, raw.clone())
                    } else {
                        match downstream.connections.get(&id) {
                            Some(connection) => ResourceResponse::new(200, connection.to_string()),
                            None => ResourceResponse::new(404, ""),
                        }
                    }
                }
                Method::Put => {
                    let body = request.body.clone().unwrap_or(Value::Null);
                    let created = downstream.connections.insert(id, body).is_none();
                    ResourceResponse::new(if created { 201 } else { 204 }, "")
                }
                Method::Post => ResourceResponse::new(405, ""),
            }
        };
        Ok(response)
    }
}

#[async_trait]
impl ResourceClient for FakeDownstream {
    async fn send(&self, request: ResourceRequest) -> Result<ResourceResponse, ClientError> {
        let result = self.answer(&request);
        self.exchanges.lock().unwrap().push(Exchange {
            method: request.method,
            url: request.url.clone(),
            body: request.body.clone(),
            username: request.basic_auth.as_ref().map(|a| a.username.clone()),
            password: request
                .basic_auth
                .as_ref()
                .map(|a| a.password.as_str().to_string()),
            status: result.as_ref().ok().map(|r| r.status),
        });
        result
    }
}

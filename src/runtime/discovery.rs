//! # Service Discovery
//!
//! Resolves downstream endpoints that were not configured explicitly by
//! waiting for their Service to exist and reading its named port.

use std::time::Duration;

use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use tracing::{info, warn};

use crate::config::{ControllerConfig, EndpointSource, Endpoints};
use crate::constants::{HTTP_PORT_NAME, KAFKA_PORT_NAME};
use crate::error::ControllerError;

/// Port number of the Service port called `port_name`
#[must_use]
pub fn port_by_name(service: &Service, port_name: &str) -> Option<i32> {
    service
        .spec
        .as_ref()?
        .ports
        .as_ref()?
        .iter()
        .find(|port| port.name.as_deref() == Some(port_name))
        .map(|port| port.port)
}

/// `host:port` of a Service, addressed by its name within the namespace
///
/// # Errors
/// Fails if the Service has no port called `port_name`.
pub fn service_address(
    service_name: &str,
    service: &Service,
    port_name: &str,
) -> Result<String, ControllerError> {
    let port = port_by_name(service, port_name).ok_or_else(|| ControllerError::MissingServicePort {
        service: service_name.to_string(),
        port: port_name.to_string(),
    })?;
    Ok(format!("{service_name}:{port}"))
}

/// Poll until the Service exists
///
/// API errors are logged and polling continues.
pub async fn wait_for_service(api: &Api<Service>, name: &str, poll_interval: Duration) -> Service {
    let mut announced = false;
    loop {
        match api.get_opt(name).await {
            Ok(Some(service)) => {
                info!("Service '{}' is available", name);
                return service;
            }
            Ok(None) => {
                if !announced {
                    info!("Waiting for service '{}' to be created", name);
                    announced = true;
                }
            }
            Err(e) => warn!("Failed to look up service '{}': {}", name, e),
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Resolve all three downstream endpoints
///
/// Configured hosts are used as-is. The registry and connection APIs are
/// reached over plain HTTP on the `http` port; Kafka on `tcp-clients`.
///
/// # Errors
/// Fails if a discovered Service lacks the expected named port.
pub async fn resolve_endpoints(
    client: Client,
    config: &ControllerConfig,
) -> Result<Endpoints, ControllerError> {
    let api: Api<Service> = Api::namespaced(client, &config.namespace);
    let poll = config.service_poll_interval();

    info!("Waiting for device registry to be ready");
    let registry_host = match &config.registry {
        EndpointSource::Configured(host) => host.clone(),
        EndpointSource::Discover { service } => {
            let svc = wait_for_service(&api, service, poll).await;
            format!("http://{}", service_address(service, &svc, HTTP_PORT_NAME)?)
        }
    };

    info!("Waiting for ditto gateway to be ready");
    let ditto_host = match &config.ditto {
        EndpointSource::Configured(host) => host.clone(),
        EndpointSource::Discover { service } => {
            let svc = wait_for_service(&api, service, poll).await;
            format!("http://{}", service_address(service, &svc, HTTP_PORT_NAME)?)
        }
    };

    info!("Waiting for kafka to be ready");
    let kafka_host = match &config.kafka {
        EndpointSource::Configured(host) => host.clone(),
        EndpointSource::Discover { service } => {
            let svc = wait_for_service(&api, service, poll).await;
            service_address(service, &svc, KAFKA_PORT_NAME)?
        }
    };

    let endpoints = Endpoints {
        registry_host,
        ditto_host,
        kafka_host,
    };
    info!(
        registry = %endpoints.registry_host,
        ditto = %endpoints.ditto_host,
        kafka = %endpoints.kafka_host,
        "Downstream endpoints resolved"
    );
    Ok(endpoints)
}

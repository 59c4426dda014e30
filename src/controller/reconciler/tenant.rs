//! # Tenant Registrar
//!
//! Create-or-update of the tenant in the device registry.
//!
//! `POST /v1/tenants/{tenant}` with an empty body creates the tenant (201).
//! A 409 means it already exists, which is the steady state; the tenant is
//! then overwritten with `PUT` on the same URL (204).

use serde_json::json;
use tracing::{error, info, Instrument};

use super::send_recorded;
use crate::client::{Method, ResourceClient, ResourceRequest};

const RESOURCE: &str = "tenant";

#[must_use]
pub fn tenant_url(registry_host: &str, tenant_id: &str) -> String {
    format!("{}/v1/tenants/{tenant_id}", registry_host.trim_end_matches('/'))
}

/// Make sure the tenant exists in the registry
///
/// Returns `true` when the attempt failed and should be retried.
pub async fn reconcile_tenant(
    client: &dyn ResourceClient,
    registry_host: &str,
    tenant_id: &str,
) -> bool {
    let span = tracing::info_span!("tenant.reconcile", tenant = tenant_id);
    async {
        let url = tenant_url(registry_host, tenant_id);

        let create = ResourceRequest::new(Method::Post, &url).json(json!({}));
        match send_recorded(client, RESOURCE, "create", create).await {
            Err(e) => {
                error!("Failed to create tenant: {}", e);
                true
            }
            Ok(response) if response.status == 201 => {
                info!("✅ Tenant created");
                false
            }
            Ok(response) if response.status == 409 => {
                let update = ResourceRequest::new(Method::Put, &url).json(json!({}));
                match send_recorded(client, RESOURCE, "update", update).await {
                    Err(e) => {
                        error!("Failed to update tenant: {}", e);
                        true
                    }
                    Ok(response) if response.status == 204 => {
                        info!("✅ Tenant updated");
                        false
                    }
                    Ok(response) => {
                        error!(
                            status = response.status,
                            body = %response.body,
                            "Failed to update tenant"
                        );
                        true
                    }
                }
            }
            Ok(response) => {
                error!(
                    status = response.status,
                    body = %response.body,
                    "Failed to create tenant"
                );
                true
            }
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_url() {
        assert_eq!(
            tenant_url("http://registry:8080", "acme"),
            "http://registry:8080/v1/tenants/acme"
        );
        assert_eq!(
            tenant_url("http://registry:8080/", "acme"),
            "http://registry:8080/v1/tenants/acme"
        );
    }
}

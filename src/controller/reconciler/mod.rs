//! # Reconciler
//!
//! Drives one reconciliation pass against the two downstream resources.
//!
//! - `tenant`: create-or-update of the tenant in the device registry
//! - `connection`: fetch-or-template-then-update of the Kafka connection
//! - `template`: default connection document
//! - `retry`: bounded retry policy for failed passes
//!
//! A pass only runs against a complete credential state. Both downstream
//! resources are always attempted, so a failing tenant registry never holds
//! back the connection and vice versa.

pub mod connection;
pub mod retry;
pub mod template;
pub mod tenant;

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn, Instrument};

pub use connection::{apply_credentials, connection_url, reconcile_connection};
pub use retry::{RetriesExhausted, RetryDecision, RetryScheduler};
pub use tenant::{reconcile_tenant, tenant_url};

use crate::client::{ClientError, ResourceClient, ResourceRequest, ResourceResponse};
use crate::config::Endpoints;
use crate::credentials::CompositeCredentialState;
use crate::observability::metrics;

/// Reconciler context shared by every pass
pub struct Reconciler {
    client: Arc<dyn ResourceClient>,
    endpoints: Endpoints,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(client: Arc<dyn ResourceClient>, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// Run one reconciliation pass
    ///
    /// Returns `true` when the tenant or the connection asked for a retry.
    /// An incomplete state is not a failure: nothing is sent and no retry is
    /// requested.
    pub async fn reconcile(&self, state: &CompositeCredentialState) -> bool {
        let Some(credentials) = state.ready() else {
            warn!(
                missing = ?state.missing_facets(),
                "State is not yet initialized, skipping update"
            );
            metrics::increment_reconciliations("not_ready");
            return false;
        };

        let span = tracing::info_span!("reconcile", tenant = credentials.tenant_id);
        async {
            let start = Instant::now();

            let retry_tenant = reconcile_tenant(
                self.client.as_ref(),
                &self.endpoints.registry_host,
                credentials.tenant_id,
            )
            .await;

            let retry_connection = reconcile_connection(
                self.client.as_ref(),
                &self.endpoints.ditto_host,
                &self.endpoints.kafka_host,
                &credentials,
            )
            .await;

            metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

            let needs_retry = retry_tenant || retry_connection;
            if needs_retry {
                metrics::increment_reconciliations("retry");
                warn!(
                    tenant_failed = retry_tenant,
                    connection_failed = retry_connection,
                    "Reconciliation failed, retry scheduled"
                );
            } else {
                metrics::increment_reconciliations("success");
                info!("Reconciliation complete");
            }
            needs_retry
        }
        .instrument(span)
        .await
    }
}

/// Send a request and record it in the downstream request metrics
pub(crate) async fn send_recorded(
    client: &dyn ResourceClient,
    resource: &str,
    operation: &str,
    request: ResourceRequest,
) -> Result<ResourceResponse, ClientError> {
    let start = Instant::now();
    let result = client.send(request).await;
    let status = match &result {
        Ok(response) => response.status.to_string(),
        Err(ClientError::Timeout { .. }) => "timeout".to_string(),
        Err(_) => "error".to_string(),
    };
    metrics::record_downstream_request(
        resource,
        operation,
        &status,
        start.elapsed().as_secs_f64(),
    );
    result
}

//! # Tenant Sync Controller
//!
//! A Kubernetes controller that keeps a Hono tenant and its Ditto Kafka
//! connection in sync with TLS credentials.
//!
//! ## Overview
//!
//! 1. **Watching credential sources** - a TLS Secret, a CA Secret, a devops
//!    password Secret and a tenant ConfigMap, each by name
//! 2. **Aggregating** - each change updates one facet of an in-memory state
//! 3. **Reconciling** - once every facet is known, the tenant is created or
//!    updated in the device registry and the tenant's Kafka connection is
//!    merged with the current credentials
//! 4. **Retrying** - failed passes are retried on a fixed interval; the
//!    process exits once the retry bound is exhausted
//!
//! Prometheus metrics and health probes are served on `METRICS_PORT`.

use anyhow::Result;
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    tenant_sync_controller::runtime::run().await.inspect_err(|e| {
        error!("Controller stopped: {:#}", e);
    })
}

//! # Runtime
//!
//! Wires the controller together and runs it.
//!
//! - `initialization`: rustls, tracing, metrics, server, Kubernetes client
//! - `discovery`: waiting for the downstream Services
//! - `control_loop`: the single-owner event loop

pub mod control_loop;
pub mod discovery;
pub mod initialization;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::client::RestResourceClient;
use crate::constants::SOURCE_CHANNEL_CAPACITY;
use crate::controller::reconciler::Reconciler;
use crate::sources::{spawn_config_map_source, spawn_secret_source, SourceKind};

pub use control_loop::{ControlLoop, Selectors};
pub use initialization::{initialize, InitializationResult};

/// Initialize and run the controller until a fatal error
///
/// # Errors
/// Returns an error if initialization fails, every source stops, or
/// reconciliation keeps failing past the retry bound.
pub async fn run() -> Result<()> {
    let InitializationResult {
        client,
        config,
        endpoints,
        server_state,
    } = initialize().await?;

    let http_client = RestResourceClient::new(
        config.http_request_timeout(),
        config.insecure_skip_tls_verify,
    )
    .context("Failed to create downstream HTTP client")?;
    let reconciler = Reconciler::new(Arc::new(http_client), endpoints);

    let (tx, rx) = mpsc::channel(SOURCE_CHANNEL_CAPACITY);
    let ns = config.namespace.as_str();
    spawn_secret_source(client.clone(), ns, &config.tls_secret_name, SourceKind::Tls, tx.clone());
    spawn_secret_source(
        client.clone(),
        ns,
        &config.ca_secret_name,
        SourceKind::CertificateAuthority,
        tx.clone(),
    );
    spawn_secret_source(
        client.clone(),
        ns,
        &config.devops_secret_name,
        SourceKind::SharedSecret,
        tx.clone(),
    );
    spawn_config_map_source(
        client,
        ns,
        &config.tenant_config_map_name,
        SourceKind::Tenant,
        tx,
    );

    let control_loop = ControlLoop::new(
        Selectors::from(&config),
        reconciler,
        config.max_retries,
        config.retry_interval(),
    );

    server_state.is_ready.store(true, Ordering::Relaxed);
    info!("Watching credential sources in namespace '{}'", config.namespace);

    let result = control_loop.run(rx).await;
    server_state.is_ready.store(false, Ordering::Relaxed);
    result.context("Control loop stopped")
}

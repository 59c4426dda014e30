//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, configuration loading, Kubernetes client setup and
//! endpoint discovery.

use crate::config::{ControllerConfig, Endpoints, LogFormat, ServerConfig};
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use crate::runtime::discovery::resolve_endpoints;
use anyhow::{Context, Result};
use kube::Client;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "tenant_sync_controller=info";

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    pub config: ControllerConfig,
    /// Downstream endpoints, configured or discovered
    pub endpoints: Endpoints,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field("endpoints", &self.endpoints)
            .field(
                "server_listening",
                &self.server_state.is_listening.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Configuration loading
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Waiting for the downstream Services
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything touches rustls
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow::anyhow!("Failed to install rustls crypto provider"));
    }

    // Load before the subscriber so the log format is known; report errors after
    let config = ControllerConfig::from_env();
    init_tracing(
        config
            .as_ref()
            .map_or(LogFormat::Json, |config| config.log_format),
    );
    let config = config.context("Failed to load controller configuration")?;
    let server_config = ServerConfig::from_env();

    info!("Starting Tenant Sync Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(config = ?config, "Configuration loaded");

    // Initialize metrics
    observability::metrics::register_metrics()?;

    // Create server state
    let server_state = Arc::new(ServerState::new());

    // Start HTTP server for metrics and probes
    let server_state_clone = server_state.clone();
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Poll server startup - wait for it to be ready before proceeding
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    // Create Kubernetes client
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let endpoints = resolve_endpoints(client.clone(), &config)
        .await
        .context("Failed to resolve downstream endpoints")?;

    info!("Controller initialized, starting control loop...");

    Ok(InitializationResult {
        client,
        config,
        endpoints,
        server_state,
    })
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        // Check if server task crashed
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        // Check if server is listening (set by start_server once bound)
        if server_state.is_listening.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        // Check timeout
        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        // Wait before next poll
        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.
//!
//! Names of the watched Secrets/ConfigMap and their keys, the downstream
//! endpoints (given explicitly or discovered from Services), and the retry
//! policy. Optional settings fall back to defaults when unset or unparsable;
//! missing required settings fail startup.

use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    DEFAULT_CA_SECRET_SELECTOR, DEFAULT_DEVOPS_SECRET_SELECTOR, DEFAULT_HTTP_REQUEST_TIMEOUT_SECS,
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL_SECS, DEFAULT_SERVICE_POLL_INTERVAL_SECS,
    DEFAULT_TENANT_CONFIG_MAP_SELECTOR, DEFAULT_TLS_SECRET_CRT_SELECTOR,
    DEFAULT_TLS_SECRET_KEY_SELECTOR, SERVICE_ACCOUNT_NAMESPACE_PATH,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("neither {host} nor {service} is set")]
    MissingEndpoint {
        host: &'static str,
        service: &'static str,
    },
    #[error("no target namespace configured and {path} is unreadable: {source}")]
    Namespace {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Where a downstream endpoint comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointSource {
    /// Given verbatim by the operator
    Configured(String),
    /// Derived from a Service in the target namespace once it exists
    Discover { service: String },
}

/// Downstream endpoints after discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Tenant registry base URL, e.g. `http://registry:8080`
    pub registry_host: String,
    /// Connection API base URL, e.g. `http://ditto:8080`
    pub ditto_host: String,
    /// Kafka bootstrap `host:port`
    pub kafka_host: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("text") {
            LogFormat::Text
        } else {
            LogFormat::Json
        }
    }
}

/// Controller-level configuration
///
/// Environment variables are populated from the deployment manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace holding the watched resources and the prerequisite Services
    pub namespace: String,

    /// Secret carrying the client certificate chain and private key
    pub tls_secret_name: String,
    pub tls_secret_key_selector: String,
    pub tls_secret_crt_selector: String,

    /// Secret carrying the CA certificate (defaults to the TLS secret)
    pub ca_secret_name: String,
    pub ca_secret_selector: String,

    /// Secret carrying the devops password used for basic auth
    pub devops_secret_name: String,
    pub devops_secret_selector: String,

    /// ConfigMap carrying the tenant ID
    pub tenant_config_map_name: String,
    pub tenant_config_map_selector: String,

    pub registry: EndpointSource,
    pub ditto: EndpointSource,
    pub kafka: EndpointSource,

    /// Consecutive failed attempts before the controller exits
    pub max_retries: u32,
    /// Retry timer period (seconds)
    pub retry_interval_secs: u64,
    /// Per-request timeout for downstream HTTP calls (seconds)
    pub http_request_timeout_secs: u64,
    /// Accept invalid TLS certificates from the downstream APIs
    pub insecure_skip_tls_verify: bool,
    /// Poll period while waiting for prerequisite Services (seconds)
    pub service_poll_interval_secs: u64,
    pub log_format: LogFormat,
}

impl ControllerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or the namespace
    /// cannot be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    /// See [`ControllerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let namespace = match get("TARGET_NAMESPACE").or_else(|| get("POD_NAMESPACE")) {
            Some(namespace) => namespace,
            None => std::fs::read_to_string(SERVICE_ACCOUNT_NAMESPACE_PATH)
                .map(|s| s.trim().to_string())
                .map_err(|source| ConfigError::Namespace {
                    path: SERVICE_ACCOUNT_NAMESPACE_PATH,
                    source,
                })?,
        };

        let tls_secret_name = required("TLS_SECRET_NAME")?;
        let ca_secret_name = get("CA_SECRET_NAME").unwrap_or_else(|| tls_secret_name.clone());

        let endpoint = |host: &'static str, service: &'static str| {
            get(host)
                .map(EndpointSource::Configured)
                .or_else(|| get(service).map(|service| EndpointSource::Discover { service }))
                .ok_or(ConfigError::MissingEndpoint { host, service })
        };

        Ok(Self {
            namespace,
            tls_secret_name,
            tls_secret_key_selector: or_default(
                "TLS_SECRET_KEY_SELECTOR",
                DEFAULT_TLS_SECRET_KEY_SELECTOR,
            ),
            tls_secret_crt_selector: or_default(
                "TLS_SECRET_CRT_SELECTOR",
                DEFAULT_TLS_SECRET_CRT_SELECTOR,
            ),
            ca_secret_name,
            ca_secret_selector: or_default("CA_SECRET_SELECTOR", DEFAULT_CA_SECRET_SELECTOR),
            devops_secret_name: required("DEVOPS_SECRET_NAME")?,
            devops_secret_selector: or_default(
                "DEVOPS_SECRET_SELECTOR",
                DEFAULT_DEVOPS_SECRET_SELECTOR,
            ),
            tenant_config_map_name: required("TENANT_CONFIG_MAP_NAME")?,
            tenant_config_map_selector: or_default(
                "TENANT_CONFIG_MAP_SELECTOR",
                DEFAULT_TENANT_CONFIG_MAP_SELECTOR,
            ),
            registry: endpoint("REGISTRY_HOST", "REGISTRY_SERVICE")?,
            ditto: endpoint("DITTO_HOST", "DITTO_SERVICE")?,
            kafka: endpoint("KAFKA_HOST", "KAFKA_SERVICE")?,
            max_retries: env_var_or_default(&get, "MAX_RETRIES", DEFAULT_MAX_RETRIES).max(1),
            retry_interval_secs: env_var_or_default(
                &get,
                "RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )
            .max(1),
            http_request_timeout_secs: env_var_or_default(
                &get,
                "HTTP_REQUEST_TIMEOUT_SECS",
                DEFAULT_HTTP_REQUEST_TIMEOUT_SECS,
            )
            .max(1),
            insecure_skip_tls_verify: env_var_or_default_bool(
                &get,
                "INSECURE_SKIP_TLS_VERIFY",
                false,
            ),
            service_poll_interval_secs: env_var_or_default(
                &get,
                "SERVICE_POLL_INTERVAL_SECS",
                DEFAULT_SERVICE_POLL_INTERVAL_SECS,
            ),
            log_format: LogFormat::parse(&or_default("LOG_FORMAT", "json")),
        })
    }

    /// Get retry timer period
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    /// Get per-request HTTP timeout
    pub fn http_request_timeout(&self) -> Duration {
        Duration::from_secs(self.http_request_timeout_secs)
    }

    /// Get service discovery poll period
    pub fn service_poll_interval(&self) -> Duration {
        Duration::from_secs(self.service_poll_interval_secs)
    }
}

/// Read a variable through `lookup` or return the default value
pub(crate) fn env_var_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a variable through `lookup` as boolean or return the default
fn env_var_or_default_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

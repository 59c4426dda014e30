//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable (see [`crate::config`]).

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Consecutive failed reconciliation attempts tolerated before the controller gives up
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Period of the retry timer while a reconciliation is pending (seconds)
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 5;

/// Upper bound for a single outbound HTTP request (seconds)
pub const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Poll period while waiting for a prerequisite Service to appear (seconds)
pub const DEFAULT_SERVICE_POLL_INTERVAL_SECS: u64 = 2;

/// Capacity of the channel between the source watchers and the control loop
pub const SOURCE_CHANNEL_CAPACITY: usize = 16;

/// Default key of the private key inside the TLS secret
pub const DEFAULT_TLS_SECRET_KEY_SELECTOR: &str = "tls.key";

/// Default key of the certificate chain inside the TLS secret
pub const DEFAULT_TLS_SECRET_CRT_SELECTOR: &str = "tls.crt";

/// Default key of the CA certificate inside the CA secret
pub const DEFAULT_CA_SECRET_SELECTOR: &str = "ca.crt";

/// Default key of the devops password inside the devops secret
pub const DEFAULT_DEVOPS_SECRET_SELECTOR: &str = "devops-password";

/// Default key of the tenant ID inside the tenant ConfigMap
pub const DEFAULT_TENANT_CONFIG_MAP_SELECTOR: &str = "tenant";

/// User name paired with the shared secret for basic auth against the connection API
pub const DEVOPS_USER: &str = "devops";

/// Named Service port used to reach the registry and connection HTTP APIs
pub const HTTP_PORT_NAME: &str = "http";

/// Named Service port used by Kafka clients
pub const KAFKA_PORT_NAME: &str = "tcp-clients";

/// Prefix of the connection ID; the tenant ID is appended
pub const CONNECTION_ID_PREFIX: &str = "hono-kafka-connection-for-";

/// Namespace file mounted into every pod with a service account
pub const SERVICE_ACCOUNT_NAMESPACE_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

//! Tenant Sync Controller Library
//!
//! Keeps a device-registry tenant and its Kafka connection in sync with TLS
//! credentials that arrive independently from Kubernetes Secrets and a
//! ConfigMap.
//!
//! Tests are included in the module files and under `tests/`.

pub mod client;
pub mod config;
pub mod constants;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod observability;
pub mod runtime;
pub mod sources;

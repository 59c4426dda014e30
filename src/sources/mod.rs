//! # Credential Sources
//!
//! Each credential facet comes from its own Kubernetes object. A source is an
//! endless stream of snapshots of that object's data; producers run as
//! independent tasks and feed one channel consumed by the control loop.
//!
//! - `watch`: Kubernetes watch producers for Secrets and ConfigMaps

pub mod watch;

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use zeroize::Zeroizing;

pub use watch::{spawn_config_map_source, spawn_secret_source};

/// Which facet a snapshot feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Client certificate chain and private key
    Tls,
    /// CA certificate
    CertificateAuthority,
    /// Devops password used for basic auth
    SharedSecret,
    /// Tenant ID
    Tenant,
}

impl SourceKind {
    /// Get human-readable string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Tls => "tls",
            SourceKind::CertificateAuthority => "ca",
            SourceKind::SharedSecret => "shared-secret",
            SourceKind::Tenant => "tenant",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest key-value content of a named object
#[derive(Default)]
pub struct SourceSnapshot {
    /// `namespace/name` of the object, for logging
    pub name: String,
    pub data: BTreeMap<String, Zeroizing<Vec<u8>>>,
}

impl SourceSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    /// Add an entry, replacing any previous value under `key`
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.into(), Zeroizing::new(value.into()));
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data.get(key).map(|v| v.as_slice())
    }

    pub fn from_secret(secret: &Secret) -> Self {
        let mut snapshot = Self::new(object_name(
            secret.metadata.namespace.as_deref(),
            secret.metadata.name.as_deref(),
        ));
        for (key, value) in secret.data.iter().flatten() {
            snapshot
                .data
                .insert(key.clone(), Zeroizing::new(value.0.clone()));
        }
        snapshot
    }

    pub fn from_config_map(config_map: &ConfigMap) -> Self {
        let mut snapshot = Self::new(object_name(
            config_map.metadata.namespace.as_deref(),
            config_map.metadata.name.as_deref(),
        ));
        for (key, value) in config_map.binary_data.iter().flatten() {
            snapshot
                .data
                .insert(key.clone(), Zeroizing::new(value.0.clone()));
        }
        for (key, value) in config_map.data.iter().flatten() {
            snapshot
                .data
                .insert(key.clone(), Zeroizing::new(value.clone().into_bytes()));
        }
        snapshot
    }
}

impl std::fmt::Debug for SourceSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSnapshot")
            .field("name", &self.name)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A snapshot tagged with the facet it feeds
#[derive(Debug)]
pub struct SourceEvent {
    pub kind: SourceKind,
    pub snapshot: SourceSnapshot,
}

fn object_name(namespace: Option<&str>, name: Option<&str>) -> String {
    format!(
        "{}/{}",
        namespace.unwrap_or("unknown"),
        name.unwrap_or("unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use kube::api::ObjectMeta;

    #[test]
    fn test_snapshot_from_secret() {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some("ditto-kafka-tls".to_string()),
                namespace: Some("dt4mob".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                "tls.crt".to_string(),
                ByteString(b"cert".to_vec()),
            )])),
            ..Default::default()
        };
        let snapshot = SourceSnapshot::from_secret(&secret);
        assert_eq!(snapshot.name, "dt4mob/ditto-kafka-tls");
        assert_eq!(snapshot.get("tls.crt"), Some(b"cert".as_slice()));
        assert_eq!(snapshot.get("tls.key"), None);
    }

    #[test]
    fn test_snapshot_from_config_map_merges_binary_and_text_data() {
        let config_map = ConfigMap {
            metadata: ObjectMeta {
                name: Some("tenant".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("tenant".to_string(), "acme".to_string())])),
            binary_data: Some(BTreeMap::from([(
                "logo".to_string(),
                ByteString(vec![0xff]),
            )])),
            ..Default::default()
        };
        let snapshot = SourceSnapshot::from_config_map(&config_map);
        assert_eq!(snapshot.name, "unknown/tenant");
        assert_eq!(snapshot.get("tenant"), Some(b"acme".as_slice()));
        assert_eq!(snapshot.get("logo"), Some([0xff].as_slice()));
    }

    #[test]
    fn test_snapshot_debug_hides_values() {
        let snapshot = SourceSnapshot::new("ns/devops").with_entry("devops-password", "s3cr3t");
        let rendered = format!("{snapshot:?}");
        assert!(rendered.contains("devops-password"));
        assert!(!rendered.contains("s3cr3t"));
    }
}

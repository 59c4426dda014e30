//! # Composite Credential State
//!
//! Merges the four independently sourced facets (key pair, CA certificate,
//! shared secret, tenant ID) into one value owned by the control loop.
//!
//! Each setter extracts its facet from a source snapshot and either replaces
//! the facet (returns `Ok`) or leaves the state untouched (returns a
//! [`FacetError`]). Facets are never cleared, only replaced.

use thiserror::Error;
use zeroize::Zeroizing;

use super::keypair::{KeyPairError, TlsKeyPair};
use crate::sources::SourceSnapshot;

/// Why a snapshot did not yield a facet value
#[derive(Debug, Error)]
pub enum FacetError {
    #[error("key '{key}' not found in {source_name}")]
    MissingKey { source_name: String, key: String },
    #[error("key '{key}' in {source_name} is empty")]
    Empty { source_name: String, key: String },
    #[error("key '{key}' in {source_name} is not valid UTF-8")]
    NotUtf8 { source_name: String, key: String },
    #[error("tenant ID '{tenant_id}' in {source_name} may only contain letters, digits, '-', '_' and '.'")]
    InvalidTenantId {
        source_name: String,
        tenant_id: String,
    },
    #[error("invalid TLS key pair in {source_name}: {error}")]
    InvalidKeyPair {
        source_name: String,
        #[source]
        error: KeyPairError,
    },
}

#[derive(Default)]
pub struct CompositeCredentialState {
    tenant_id: Option<String>,
    key_pair: Option<TlsKeyPair>,
    ca_certificate: Option<String>,
    shared_secret: Option<Zeroizing<String>>,
}

/// Borrowed view of a state with every facet populated
#[derive(Clone, Copy)]
pub struct ReadyCredentials<'a> {
    pub tenant_id: &'a str,
    pub key_pair: &'a TlsKeyPair,
    pub ca_certificate: &'a str,
    pub shared_secret: &'a str,
}

impl CompositeCredentialState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the key pair from the certificate and key entries of a TLS
    /// snapshot
    ///
    /// # Errors
    /// Fails if either entry is missing or the pair does not validate.
    pub fn set_key_pair(
        &mut self,
        snapshot: &SourceSnapshot,
        key_selector: &str,
        crt_selector: &str,
    ) -> Result<(), FacetError> {
        let key_pem = require(snapshot, key_selector)?;
        let crt_pem = require(snapshot, crt_selector)?;
        let key_pair =
            TlsKeyPair::from_pem(crt_pem, key_pem).map_err(|error| FacetError::InvalidKeyPair {
                source_name: snapshot.name.clone(),
                error,
            })?;
        self.key_pair = Some(key_pair);
        Ok(())
    }

    /// # Errors
    /// Fails if the entry is missing, empty or not UTF-8.
    pub fn set_ca_certificate(
        &mut self,
        snapshot: &SourceSnapshot,
        selector: &str,
    ) -> Result<(), FacetError> {
        let ca = require_text(snapshot, selector)?;
        self.ca_certificate = Some(ca.to_string());
        Ok(())
    }

    /// # Errors
    /// Fails if the entry is missing, empty or not UTF-8.
    pub fn set_shared_secret(
        &mut self,
        snapshot: &SourceSnapshot,
        selector: &str,
    ) -> Result<(), FacetError> {
        let secret = require_text(snapshot, selector)?;
        self.shared_secret = Some(Zeroizing::new(secret.to_string()));
        Ok(())
    }

    /// Surrounding whitespace is stripped from the tenant ID. The ID is used
    /// verbatim as a URL path segment, so only `[A-Za-z0-9._-]` is accepted.
    ///
    /// # Errors
    /// Fails if the entry is missing, blank, not UTF-8 or contains other
    /// characters.
    pub fn set_tenant_id(
        &mut self,
        snapshot: &SourceSnapshot,
        selector: &str,
    ) -> Result<(), FacetError> {
        let tenant = require_text(snapshot, selector)?.trim();
        if tenant.is_empty() {
            return Err(FacetError::Empty {
                source_name: snapshot.name.clone(),
                key: selector.to_string(),
            });
        }
        if !is_valid_tenant_id(tenant) {
            return Err(FacetError::InvalidTenantId {
                source_name: snapshot.name.clone(),
                tenant_id: tenant.to_string(),
            });
        }
        self.tenant_id = Some(tenant.to_string());
        Ok(())
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready().is_some()
    }

    /// All four facets, or `None` while any is still missing
    #[must_use]
    pub fn ready(&self) -> Option<ReadyCredentials<'_>> {
        Some(ReadyCredentials {
            tenant_id: self.tenant_id.as_deref()?,
            key_pair: self.key_pair.as_ref()?,
            ca_certificate: self.ca_certificate.as_deref()?,
            shared_secret: self.shared_secret.as_deref().map(String::as_str)?,
        })
    }

    /// Names of the facets still missing, for logging
    #[must_use]
    pub fn missing_facets(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.tenant_id.is_none() {
            missing.push("tenant");
        }
        if self.key_pair.is_none() {
            missing.push("tls");
        }
        if self.ca_certificate.is_none() {
            missing.push("ca");
        }
        if self.shared_secret.is_none() {
            missing.push("shared-secret");
        }
        missing
    }
}

impl std::fmt::Debug for CompositeCredentialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeCredentialState")
            .field("tenant_id", &self.tenant_id)
            .field("key_pair", &self.key_pair.as_ref().map(|_| "***"))
            .field("ca_certificate", &self.ca_certificate.as_ref().map(|_| "<pem>"))
            .field("shared_secret", &self.shared_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

fn is_valid_tenant_id(tenant: &str) -> bool {
    tenant
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn require<'a>(snapshot: &'a SourceSnapshot, key: &str) -> Result<&'a [u8], FacetError> {
    let value = snapshot.get(key).ok_or_else(|| FacetError::MissingKey {
        source_name: snapshot.name.clone(),
        key: key.to_string(),
    })?;
    if value.is_empty() {
        return Err(FacetError::Empty {
            source_name: snapshot.name.clone(),
            key: key.to_string(),
        });
    }
    Ok(value)
}

fn require_text<'a>(snapshot: &'a SourceSnapshot, key: &str) -> Result<&'a str, FacetError> {
    std::str::from_utf8(require(snapshot, key)?).map_err(|_| FacetError::NotUtf8 {
        source_name: snapshot.name.clone(),
        key: key.to_string(),
    })
}

//! # Credentials
//!
//! Credential material the controller pushes downstream.
//!
//! - `state`: the composite credential state and its per-facet setters
//! - `keypair`: TLS key-pair parsing and validation
//! - `pem`: PEM encoding of validated key material

pub mod keypair;
pub mod pem;
pub mod state;

pub use keypair::{KeyFormat, KeyPairError, PrivateKeyMaterial, TlsKeyPair};
pub use pem::{encode_certificate_chain_pem, encode_private_key_pem, EncodingError};
pub use state::{CompositeCredentialState, FacetError, ReadyCredentials};

//! # PEM Materialization
//!
//! Turns a validated key pair into the PEM text embedded in the connection
//! document: the private key always as PKCS#8 (`PRIVATE KEY`), the chain as
//! one `CERTIFICATE` block per certificate in chain order.
//!
//! Pure functions; the same input always yields the same text.

use base64::{engine::general_purpose, Engine as _};
use rustls::pki_types::CertificateDer;
use thiserror::Error;
use zeroize::Zeroizing;

use super::keypair::{KeyFormat, PrivateKeyMaterial};

const PEM_LINE_WIDTH: usize = 64;

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_SEQUENCE: u8 = 0x30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("{0:?} private key cannot be converted to PKCS#8 without its public key info")]
    MissingPublicKeyInfo(KeyFormat),
    #[error("public key info is not a DER SubjectPublicKeyInfo")]
    MalformedPublicKeyInfo,
}

/// Encode a private key as a PKCS#8 PEM block
///
/// PKCS#1 and SEC1 keys are wrapped into a `PrivateKeyInfo` using the
/// algorithm identifier of the key's `SubjectPublicKeyInfo`.
///
/// # Errors
/// Fails if a non-PKCS#8 key has no usable public key info.
pub fn encode_private_key_pem(key: &PrivateKeyMaterial) -> Result<Zeroizing<String>, EncodingError> {
    let pkcs8 = match key.format() {
        KeyFormat::Pkcs8 => Zeroizing::new(key.der().to_vec()),
        format => {
            let spki = key
                .public_key_info()
                .ok_or(EncodingError::MissingPublicKeyInfo(format))?;
            let algorithm =
                algorithm_identifier(spki).ok_or(EncodingError::MalformedPublicKeyInfo)?;
            Zeroizing::new(wrap_pkcs8(algorithm, key.der()))
        }
    };
    Ok(Zeroizing::new(encode_pem_block("PRIVATE KEY", &pkcs8)))
}

/// Encode a certificate chain as concatenated `CERTIFICATE` PEM blocks
#[must_use]
pub fn encode_certificate_chain_pem(chain: &[CertificateDer<'_>]) -> String {
    chain
        .iter()
        .map(|cert| encode_pem_block("CERTIFICATE", cert.as_ref()))
        .collect()
}

/// Encode one PEM block with 64-column base64 lines
#[must_use]
pub fn encode_pem_block(label: &str, der: &[u8]) -> String {
    let body = general_purpose::STANDARD.encode(der);
    let mut out = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + label.len() * 2 + 32);
    out.push_str("-----BEGIN ");
    out.push_str(label);
    out.push_str("-----\n");
    for (i, c) in body.chars().enumerate() {
        if i > 0 && i % PEM_LINE_WIDTH == 0 {
            out.push('\n');
        }
        out.push(c);
    }
    if !body.is_empty() {
        out.push('\n');
    }
    out.push_str("-----END ");
    out.push_str(label);
    out.push_str("-----\n");
    out
}

/// `PrivateKeyInfo ::= SEQUENCE { version 0, algorithm, OCTET STRING key }`
fn wrap_pkcs8(algorithm: &[u8], key: &[u8]) -> Vec<u8> {
    let mut content = der_tlv(TAG_INTEGER, &[0x00]);
    content.extend_from_slice(algorithm);
    content.extend(der_tlv(TAG_OCTET_STRING, key));
    der_tlv(TAG_SEQUENCE, &content)
}

/// The complete `AlgorithmIdentifier` element at the start of a
/// `SubjectPublicKeyInfo`
fn algorithm_identifier(spki: &[u8]) -> Option<&[u8]> {
    let (tag, content, _) = read_tlv(spki)?;
    if tag != TAG_SEQUENCE {
        return None;
    }
    let (tag, _, rest) = read_tlv(content)?;
    if tag != TAG_SEQUENCE {
        return None;
    }
    Some(&content[..content.len() - rest.len()])
}

fn der_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 6);
    out.push(tag);
    let len = content.len();
    if len < 0x80 {
        #[allow(clippy::cast_possible_truncation, reason = "len < 0x80")]
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        let significant = &bytes[skip..];
        #[allow(clippy::cast_possible_truncation, reason = "at most size_of::<usize>() bytes")]
        out.push(0x80 | significant.len() as u8);
        out.extend_from_slice(significant);
    }
    out.extend_from_slice(content);
    out
}

/// Split one DER element off `input`: `(tag, content, rest)`
fn read_tlv(input: &[u8]) -> Option<(u8, &[u8], &[u8])> {
    let (&tag, input) = input.split_first()?;
    let (&first, input) = input.split_first()?;
    let (len, input) = if first < 0x80 {
        (usize::from(first), input)
    } else {
        let count = usize::from(first & 0x7f);
        if count == 0 || count > 4 || input.len() < count {
            return None;
        }
        let (len_bytes, input) = input.split_at(count);
        let len = len_bytes
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
        (len, input)
    };
    if input.len() < len {
        return None;
    }
    let (content, rest) = input.split_at(len);
    Some((tag, content, rest))
}

//! # Connection Synchronizer
//!
//! Fetch-or-template-then-update of the tenant's Kafka connection.
//!
//! The existing connection (or the default template when there is none yet)
//! is merged with the current credentials and written back. Only `ca`,
//! `credentials`, `uri` and `validateCertificates` are overwritten; every
//! other field of an existing connection is sent back unchanged.

use serde_json::{json, Map, Value};
use tracing::{error, info, Instrument};

use super::send_recorded;
use super::template::{connection_id, default_connection};
use crate::client::{BasicAuth, Method, ResourceClient, ResourceRequest};
use crate::constants::DEVOPS_USER;
use crate::credentials::{
    encode_certificate_chain_pem, encode_private_key_pem, EncodingError, ReadyCredentials,
};
use crate::observability::metrics;

const RESOURCE: &str = "connection";

#[must_use]
pub fn connection_url(ditto_host: &str, tenant_id: &str) -> String {
    format!(
        "{}/api/2/connections/{}",
        ditto_host.trim_end_matches('/'),
        connection_id(tenant_id)
    )
}

/// Overwrite the credential fields of a connection document
///
/// # Errors
/// Fails if the private key cannot be encoded; the document is left
/// untouched in that case.
pub fn apply_credentials(
    connection: &mut Map<String, Value>,
    credentials: &ReadyCredentials<'_>,
    kafka_host: &str,
) -> Result<(), EncodingError> {
    let key = encode_private_key_pem(credentials.key_pair.private_key())?;
    let cert = encode_certificate_chain_pem(credentials.key_pair.certificate_chain());

    connection.insert("ca".to_string(), json!(credentials.ca_certificate));
    connection.insert(
        "credentials".to_string(),
        json!({
            "type": "client-cert",
            "cert": cert,
            "key": key.as_str(),
        }),
    );
    connection.insert("uri".to_string(), json!(format!("ssl://{kafka_host}")));
    connection.insert("validateCertificates".to_string(), Value::Bool(true));
    Ok(())
}

/// Bring the tenant's connection in line with the current credentials
///
/// Returns `true` when the attempt failed and should be retried. Key
/// material that cannot be encoded skips the update without asking for a
/// retry, since only new input can fix it.
pub async fn reconcile_connection(
    client: &dyn ResourceClient,
    ditto_host: &str,
    kafka_host: &str,
    credentials: &ReadyCredentials<'_>,
) -> bool {
    let span = tracing::info_span!(
        "connection.reconcile",
        tenant = credentials.tenant_id,
        connection = %connection_id(credentials.tenant_id)
    );
    async {
        let url = connection_url(ditto_host, credentials.tenant_id);
        let auth = BasicAuth::new(DEVOPS_USER, credentials.shared_secret);

        let fetch = ResourceRequest::new(Method::Get, &url).basic_auth(auth.clone());
        let mut connection = match send_recorded(client, RESOURCE, "get", fetch).await {
            Err(e) => {
                error!("Failed to get existing connection, skipping update: {}", e);
                return true;
            }
            Ok(response) if response.status == 404 => {
                info!("Connection does not yet exist, rendering default");
                default_connection(credentials.tenant_id, kafka_host)
            }
            Ok(response) if response.status == 200 => {
                match serde_json::from_str::<Value>(&response.body) {
                    Ok(Value::Object(map)) => map,
                    Ok(other) => {
                        error!(
                            "Existing connection is not a JSON object ({}), skipping update",
                            json_kind(&other)
                        );
                        return true;
                    }
                    Err(e) => {
                        error!("Failed to parse existing connection, skipping update: {}", e);
                        return true;
                    }
                }
            }
            Ok(response) => {
                error!(
                    status = response.status,
                    body = %response.body,
                    "Failed to get existing connection, skipping update"
                );
                return true;
            }
        };

        if let Err(e) = apply_credentials(&mut connection, credentials, kafka_host) {
            error!("Failed to encode private key, skipping update: {}", e);
            metrics::increment_encoding_failures();
            return false;
        }

        let update = ResourceRequest::new(Method::Put, &url)
            .json(Value::Object(connection))
            .basic_auth(auth);
        match send_recorded(client, RESOURCE, "update", update).await {
            Err(e) => {
                error!("Failed to update connection: {}", e);
                true
            }
            Ok(response) if response.is_success() => {
                info!(status = response.status, "✅ Connection updated");
                false
            }
            Ok(response) => {
                error!(
                    status = response.status,
                    body = %response.body,
                    "Failed to update connection"
                );
                true
            }
        }
    }
    .instrument(span)
    .await
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

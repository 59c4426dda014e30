//! Default Kafka connection document
//!
//! Used when the connection API has no connection for the tenant yet. The
//! credential fields it carries are overwritten by the synchronizer before
//! the document is sent.

use serde_json::{json, Map, Value};

use crate::constants::CONNECTION_ID_PREFIX;

// Placeholders resolved by the connection API at runtime, not by us
const THING_ID: &str = "{{ thing:id }}";
const HEADER_DEVICE_ID: &str = "{{ header:device_id }}";
const ENTITY_ID: &str = "{{ entity:id }}";
const CORRELATION_ID: &str = "{{ header:correlation-id }}";
const RESPONSE_SUBJECT: &str =
    "{{ header:subject | fn:default(topic:action-subject) | fn:default(topic:criterion) }}-response";

/// ID of the tenant's connection
#[must_use]
pub fn connection_id(tenant: &str) -> String {
    format!("{CONNECTION_ID_PREFIX}{tenant}")
}

/// Render the connection for `tenant` reading from the Kafka cluster at
/// `kafka_host` (`host:port`)
#[must_use]
pub fn default_connection(tenant: &str, kafka_host: &str) -> Map<String, Value> {
    let authorization_context = vec![format!("pre-authenticated:hono-connection-{tenant}")];
    let command_address = format!("hono.command.{tenant}/{THING_ID}");

    [
        ("id", json!(connection_id(tenant))),
        ("name", json!(format!("[Hono/Kafka] {tenant}"))),
        ("connectionType", json!("kafka")),
        ("connectionStatus", json!("open")),
        ("uri", json!(format!("ssl://{kafka_host}"))),
        ("failoverEnabled", json!(true)),
        ("validateCertificates", json!(true)),
        ("clientCount", json!(1)),
        ("processorPoolSize", json!(1)),
        ("sources", json!([
            {
                "addresses": [format!("hono.telemetry.{tenant}")],
                "consumerCount": 1,
                "authorizationContext": authorization_context,
                "qos": 0,
                "enforcement": {
                    "input": HEADER_DEVICE_ID,
                    "filters": [ENTITY_ID]
                },
                "headerMapping": {},
                "payloadMapping": ["Ditto"],
                "replyTarget": {
                    "enabled": true,
                    "address": command_address,
                    "headerMapping": {
                        "device_id": THING_ID,
                        "subject": RESPONSE_SUBJECT,
                        "correlation-id": CORRELATION_ID
                    },
                    "expectedResponseTypes": ["response", "error"]
                },
                "acknowledgementRequests": { "includes": [] },
                "declaredAcks": []
            },
            {
                "addresses": [format!("hono.event.{tenant}")],
                "consumerCount": 1,
                "authorizationContext": authorization_context,
                "qos": 1,
                "enforcement": {
                    "input": HEADER_DEVICE_ID,
                    "filters": [ENTITY_ID]
                },
                "headerMapping": {},
                "payloadMapping": ["Ditto"],
                "replyTarget": {
                    "enabled": true,
                    "address": command_address,
                    "headerMapping": {
                        "device_id": THING_ID,
                        "subject": RESPONSE_SUBJECT,
                        "correlation-id": CORRELATION_ID
                    },
                    "expectedResponseTypes": ["response", "error"]
                },
                "acknowledgementRequests": { "includes": [] },
                "declaredAcks": []
            },
            {
                "addresses": [format!("hono.command_response.{tenant}")],
                "consumerCount": 1,
                "authorizationContext": authorization_context,
                "qos": 0,
                "enforcement": {
                    "input": HEADER_DEVICE_ID,
                    "filters": [ENTITY_ID]
                },
                "headerMapping": {
                    "correlation-id": CORRELATION_ID,
                    "status": "{{ header:status }}"
                },
                "payloadMapping": ["Ditto"],
                "replyTarget": { "enabled": false },
                "acknowledgementRequests": { "includes": [] },
                "declaredAcks": []
            }
        ])),
        ("targets", json!([
            {
                "address": command_address,
                "topics": [
                    "_/_/things/live/commands",
                    "_/_/things/live/messages"
                ],
                "authorizationContext": authorization_context,
                "headerMapping": {
                    "device_id": THING_ID,
                    "subject": "{{ header:subject | fn:default(topic:action-subject) }}",
                    "response-required": "{{ header:response-required }}",
                    "correlation-id": CORRELATION_ID
                }
            },
            {
                "address": command_address,
                "topics": [
                    "_/_/things/twin/events",
                    "_/_/things/live/events"
                ],
                "authorizationContext": authorization_context,
                "headerMapping": {
                    "device_id": THING_ID,
                    "subject": "{{ header:subject | fn:default(topic:action-subject) }}",
                    "correlation-id": CORRELATION_ID
                }
            }
        ])),
        (
            "specificConfig",
            json!({
                "bootstrapServers": kafka_host,
                "groupId": format!("{tenant}_{{{{ connection:id }}}}")
            }),
        ),
        ("mappingDefinitions", json!({})),
        ("tags", json!([])),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

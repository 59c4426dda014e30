//! # Source Watches
//!
//! Background producers that watch a single named Secret or ConfigMap and
//! forward every applied version (the initial listing included) to the
//! control loop. Deletions are logged and otherwise ignored: the last known
//! value of a facet stays in effect.

use futures::{pin_mut, StreamExt};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Api, Client, Resource};
use kube_runtime::{watcher, WatchStreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{SourceEvent, SourceKind, SourceSnapshot};
use crate::observability::metrics;

/// Start watching a Secret by name and forward its data as `kind` events
pub fn spawn_secret_source(
    client: Client,
    namespace: &str,
    name: &str,
    kind: SourceKind,
    tx: mpsc::Sender<SourceEvent>,
) -> JoinHandle<()> {
    let api: Api<Secret> = Api::namespaced(client, namespace);
    spawn_source(api, name.to_string(), kind, tx, SourceSnapshot::from_secret)
}

/// Start watching a ConfigMap by name and forward its data as `kind` events
pub fn spawn_config_map_source(
    client: Client,
    namespace: &str,
    name: &str,
    kind: SourceKind,
    tx: mpsc::Sender<SourceEvent>,
) -> JoinHandle<()> {
    let api: Api<ConfigMap> = Api::namespaced(client, namespace);
    spawn_source(api, name.to_string(), kind, tx, SourceSnapshot::from_config_map)
}

fn spawn_source<K>(
    api: Api<K>,
    name: String,
    kind: SourceKind,
    tx: mpsc::Sender<SourceEvent>,
    to_snapshot: fn(&K) -> SourceSnapshot,
) -> JoinHandle<()>
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug + Send + Sync + 'static,
    K::DynamicType: Default + Clone + Eq + std::hash::Hash + Send + Sync,
{
    tokio::spawn(async move {
        info!(
            source = kind.as_str(),
            "Starting watch for {} '{}'",
            K::kind(&K::DynamicType::default()),
            name
        );

        let config = watcher::Config::default().fields(&format!("metadata.name={name}"));
        let stream = watcher(api, config).default_backoff();
        pin_mut!(stream);

        while let Some(event_result) = stream.next().await {
            match event_result {
                Ok(watcher::Event::Apply(obj) | watcher::Event::InitApply(obj)) => {
                    let snapshot = to_snapshot(&obj);
                    debug!(source = kind.as_str(), object = %snapshot.name, "source.event.received");
                    metrics::increment_source_events_received(kind.as_str());
                    if tx.send(SourceEvent { kind, snapshot }).await.is_err() {
                        warn!(
                            source = kind.as_str(),
                            "Control loop is gone, stopping watch for '{}'", name
                        );
                        return;
                    }
                }
                Ok(watcher::Event::Delete(_)) => {
                    warn!(
                        source = kind.as_str(),
                        "'{}' was deleted, keeping last known value", name
                    );
                }
                Ok(watcher::Event::Init | watcher::Event::InitDone) => {}
                Err(e) => {
                    // Watcher restarts with backoff
                    warn!(source = kind.as_str(), "Error watching '{}': {}", name, e);
                }
            }
        }

        warn!(source = kind.as_str(), "Watch stream for '{}' ended", name);
    })
}

//! # Control Loop
//!
//! Single owner of the composite credential state and the retry state.
//!
//! Source events and retry timer ticks are handled one at a time. An event
//! that changes the state triggers a reconciliation pass; a tick triggers
//! one only while a retry is pending.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::controller::reconciler::{Reconciler, RetriesExhausted, RetryDecision, RetryScheduler};
use crate::credentials::{CompositeCredentialState, FacetError};
use crate::error::ControllerError;
use crate::observability::metrics;
use crate::sources::{SourceEvent, SourceKind};

/// Keys to read from each source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selectors {
    pub tls_key: String,
    pub tls_crt: String,
    pub ca: String,
    pub shared_secret: String,
    pub tenant: String,
}

impl From<&ControllerConfig> for Selectors {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            tls_key: config.tls_secret_key_selector.clone(),
            tls_crt: config.tls_secret_crt_selector.clone(),
            ca: config.ca_secret_selector.clone(),
            shared_secret: config.devops_secret_selector.clone(),
            tenant: config.tenant_config_map_selector.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ControlLoop {
    selectors: Selectors,
    state: CompositeCredentialState,
    reconciler: Reconciler,
    scheduler: RetryScheduler,
    retry_interval: Duration,
}

impl ControlLoop {
    pub fn new(
        selectors: Selectors,
        reconciler: Reconciler,
        max_retries: u32,
        retry_interval: Duration,
    ) -> Self {
        let scheduler = RetryScheduler::new(max_retries);
        metrics::set_retry_attempts_remaining(scheduler.attempts_remaining());
        metrics::set_credentials_ready(false);
        Self {
            selectors,
            state: CompositeCredentialState::new(),
            reconciler,
            scheduler,
            retry_interval,
        }
    }

    #[must_use]
    pub fn state(&self) -> &CompositeCredentialState {
        &self.state
    }

    #[must_use]
    pub fn scheduler(&self) -> &RetryScheduler {
        &self.scheduler
    }

    /// Apply a source snapshot to the matching facet
    ///
    /// Returns `true` if the state changed. Snapshots that do not yield a
    /// valid value are logged and dropped.
    pub fn apply_event(&mut self, event: &SourceEvent) -> bool {
        let snapshot = &event.snapshot;
        let result: Result<(), FacetError> = match event.kind {
            SourceKind::Tls => self.state.set_key_pair(
                snapshot,
                &self.selectors.tls_key,
                &self.selectors.tls_crt,
            ),
            SourceKind::CertificateAuthority => {
                self.state.set_ca_certificate(snapshot, &self.selectors.ca)
            }
            SourceKind::SharedSecret => self
                .state
                .set_shared_secret(snapshot, &self.selectors.shared_secret),
            SourceKind::Tenant => self.state.set_tenant_id(snapshot, &self.selectors.tenant),
        };

        match result {
            Ok(()) => {
                info!(source = event.kind.as_str(), object = %snapshot.name, "Facet updated");
                metrics::increment_facet_updates(event.kind.as_str(), "accepted");
                metrics::set_credentials_ready(self.state.is_ready());
                true
            }
            Err(e) => {
                error!(source = event.kind.as_str(), "{}, skipping update", e);
                metrics::increment_facet_updates(event.kind.as_str(), "rejected");
                false
            }
        }
    }

    /// Handle one source event
    ///
    /// # Errors
    /// Returns [`RetriesExhausted`] if the triggered pass used up the last
    /// retry.
    pub async fn handle_event(&mut self, event: SourceEvent) -> Result<(), RetriesExhausted> {
        if self.apply_event(&event) {
            self.attempt().await?;
        }
        Ok(())
    }

    /// Handle one retry timer tick
    ///
    /// # Errors
    /// Returns [`RetriesExhausted`] if this retry was the last one.
    pub async fn handle_tick(&mut self) -> Result<(), RetriesExhausted> {
        if self.scheduler.is_pending() {
            info!(
                attempts_remaining = self.scheduler.attempts_remaining(),
                "Retrying update"
            );
            self.attempt().await?;
        }
        Ok(())
    }

    async fn attempt(&mut self) -> Result<(), RetriesExhausted> {
        let needs_retry = self.reconciler.reconcile(&self.state).await;
        let decision = self.scheduler.record(needs_retry);
        metrics::set_retry_attempts_remaining(self.scheduler.attempts_remaining());

        match decision {
            Ok(RetryDecision::Idle) => debug!("No retry pending"),
            Ok(RetryDecision::Pending { attempts_remaining }) => warn!(
                attempts_remaining,
                "Retry scheduled in {}s",
                self.retry_interval.as_secs()
            ),
            Err(e) => error!("❌ {}, giving up", e),
        }
        decision.map(|_| ())
    }

    /// Consume source events until the channel closes or retries run out
    ///
    /// # Errors
    /// [`ControllerError::RetriesExhausted`] when reconciliation keeps failing,
    /// [`ControllerError::SourceClosed`] when every source has stopped.
    pub async fn run(mut self, mut events: mpsc::Receiver<SourceEvent>) -> Result<(), ControllerError> {
        let mut retry_timer = interval_at(Instant::now() + self.retry_interval, self.retry_interval);
        retry_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Control loop started");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => {
                        error!("All credential sources have stopped");
                        return Err(ControllerError::SourceClosed);
                    }
                },
                _ = retry_timer.tick() => self.handle_tick().await?,
            }
        }
    }
}

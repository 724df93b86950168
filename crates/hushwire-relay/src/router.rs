//! The dispatcher: a single consumer draining validated envelopes to the
//! live connections of their recipients.
//!
//! Envelopes leave in the order they were submitted. Delivery is
//! at-most-once; nothing is retried, buffered or acknowledged.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use hushwire_proto::{Envelope, ValidationError};

use crate::metrics::RelayMetrics;
use crate::registry::ConnectionRegistry;

#[derive(Debug, Error)]
#[error("dispatcher is not running")]
pub struct DispatcherClosed;

/// Reject envelopes with an empty sender, recipient or body.
pub fn validate(envelope: &Envelope) -> Result<(), ValidationError> {
    envelope.validate()
}

pub fn is_valid(envelope: &Envelope) -> bool {
    validate(envelope).is_ok()
}

/// Producer side of the intake queue. Cheap to clone, one per connection.
#[derive(Clone, Debug)]
pub struct RouterHandle {
    intake: mpsc::UnboundedSender<Envelope>,
}

impl RouterHandle {
    pub fn submit(&self, envelope: Envelope) -> Result<(), DispatcherClosed> {
        self.intake.send(envelope).map_err(|_| DispatcherClosed)
    }
}

/// What happened to one envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub evicted: usize,
}

pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<RelayMetrics>,
    intake: mpsc::UnboundedReceiver<Envelope>,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<RelayMetrics>,
    ) -> (Self, RouterHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let router = Self {
            registry,
            metrics,
            intake: rx,
        };
        (router, RouterHandle { intake: tx })
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.process_messages())
    }

    /// Run until every [`RouterHandle`] has been dropped.
    pub async fn process_messages(mut self) {
        info!("Dispatcher started");
        while let Some(envelope) = self.intake.recv().await {
            self.dispatch_one(envelope).await;
        }
        info!("Dispatcher stopped");
    }

    pub async fn dispatch_one(&self, envelope: Envelope) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        let targets = self.registry.snapshot_for(&envelope.recipient_id).await;

        if targets.is_empty() {
            debug!(
                from = %envelope.sender_id,
                to = %envelope.recipient_id,
                "No connection for recipient, dropping envelope"
            );
            self.metrics.envelopes_dropped.inc();
            return outcome;
        }

        for target in targets {
            match target.forward(envelope.clone()) {
                Ok(()) => {
                    debug!(
                        from = %envelope.sender_id,
                        to = %envelope.recipient_id,
                        conn = target.id(),
                        len = envelope.body.len(),
                        "Forwarded envelope"
                    );
                    self.metrics.envelopes_delivered.inc();
                    outcome.delivered += 1;
                }
                Err(e) => {
                    warn!(conn = target.id(), user = %target.user_id(), error = %e, "Forward failed, evicting connection");
                    if self.registry.evict(target.id()).await {
                        self.metrics.evictions.inc();
                        self.metrics
                            .active_connections
                            .set(self.registry.len().await as f64);
                        outcome.evicted += 1;
                    }
                }
            }
        }

        outcome
    }
}

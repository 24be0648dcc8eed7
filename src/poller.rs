//! Status polling for submitted transactions.
//!
//! A `StatusWatch` is a lazy, finite sequence of observations: nothing is
//! polled until `next()` is awaited, and the sequence ends after the first
//! terminal event (sealed, expired, failed) or once the polling budget runs
//! out. Progress events are strictly increasing in confirmation depth.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::classifier::{self, classify, classify_report};
use crate::config::BaseConfig;
use crate::error::{ClassifiedError, LedgerError};
use crate::traits::LedgerGateway;
use crate::types::{TransactionId, TransactionStatus};

/// Cadence and budget for one watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before the second poll; doubles after each poll.
    pub interval: Duration,
    pub max_interval: Duration,
    /// Total polling budget. Bounds the watch, not the transaction's fate.
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &BaseConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_interval: config.poll_max_interval(),
            timeout: config.poll_timeout(),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&BaseConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A deeper, non-terminal status was observed.
    Progress(TransactionStatus),
    Sealed,
    Expired,
    /// The gateway or the transaction itself reported a failure.
    Failed(ClassifiedError),
    /// The budget ran out before a terminal status.
    TimedOut,
}

impl StatusEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusEvent::Progress(_))
    }
}

pub struct StatusPoller<G: LedgerGateway> {
    gateway: Arc<G>,
    policy: PollPolicy,
}

impl<G: LedgerGateway> Clone for StatusPoller<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            policy: self.policy,
        }
    }
}

impl<G: LedgerGateway> StatusPoller<G> {
    pub fn new(gateway: Arc<G>, policy: PollPolicy) -> Self {
        Self { gateway, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub fn watch(&self, id: TransactionId) -> StatusWatch<G> {
        self.watch_with_timeout(id, self.policy.timeout)
    }

    pub fn watch_with_timeout(&self, id: TransactionId, timeout: Duration) -> StatusWatch<G> {
        StatusWatch {
            gateway: Arc::clone(&self.gateway),
            id,
            delay: self.policy.interval,
            max_delay: self.policy.max_interval,
            timeout,
            started: None,
            last: None,
            polled: false,
            done: false,
        }
    }

    /// Poll until `id` seals. Any other terminal event becomes an error.
    pub async fn wait_for_seal(&self, id: TransactionId) -> Result<(), ClassifiedError> {
        let mut watch = self.watch(id);
        while let Some(event) = watch.next().await {
            match event {
                StatusEvent::Progress(status) => {
                    debug!("Transaction {} at {:?}", id, status);
                }
                StatusEvent::Sealed => {
                    info!("Transaction {} sealed", id);
                    return Ok(());
                }
                StatusEvent::Expired => return Err(classifier::expired(&id)),
                StatusEvent::Failed(error) => return Err(error),
                StatusEvent::TimedOut => return Err(classifier::timed_out(&id, watch.timeout)),
            }
        }
        Err(classifier::timed_out(&id, watch.timeout))
    }
}

pub struct StatusWatch<G: LedgerGateway> {
    gateway: Arc<G>,
    id: TransactionId,
    delay: Duration,
    max_delay: Duration,
    timeout: Duration,
    /// Set on the first `next()` so the budget starts when observation does.
    /// The budget is measured as elapsed time so no deadline can overflow.
    started: Option<Instant>,
    last: Option<TransactionStatus>,
    polled: bool,
    done: bool,
}

impl<G: LedgerGateway> StatusWatch<G> {
    pub fn transaction_id(&self) -> TransactionId {
        self.id
    }

    /// Deepest non-terminal status emitted so far.
    pub fn last_status(&self) -> Option<TransactionStatus> {
        self.last
    }

    pub async fn next(&mut self) -> Option<StatusEvent> {
        if self.done {
            return None;
        }
        let started = *self.started.get_or_insert_with(Instant::now);

        loop {
            if self.polled {
                let elapsed = started.elapsed();
                if elapsed >= self.timeout {
                    return Some(self.finish(StatusEvent::TimedOut));
                }
                tokio::time::sleep(self.delay.min(self.timeout - elapsed)).await;
                self.delay = self.delay.saturating_mul(2).min(self.max_delay);
            }
            self.polled = true;

            let report = match self.gateway.poll_status(&self.id).await {
                Ok(report) => report,
                Err(LedgerError::NotFound(detail)) => {
                    debug!("Transaction {} not yet known to the network: {}", self.id, detail);
                    continue;
                }
                Err(e) => return Some(self.finish(StatusEvent::Failed(classify(&e)))),
            };

            if let Some(error) = classify_report(&report) {
                return Some(self.finish(StatusEvent::Failed(error)));
            }

            match report.status {
                TransactionStatus::Sealed => return Some(self.finish(StatusEvent::Sealed)),
                TransactionStatus::Expired => return Some(self.finish(StatusEvent::Expired)),
                status if self.last.map_or(true, |last| status > last) => {
                    self.last = Some(status);
                    return Some(StatusEvent::Progress(status));
                }
                // Not deeper than what was already emitted.
                _ => continue,
            }
        }
    }

    fn finish(&mut self, event: StatusEvent) -> StatusEvent {
        self.done = true;
        event
    }
}

//! Concurrency-limited dispatch of one batch.
//!
//! Every target gets its own future; a shared counting gate caps how many of
//! them talk to the transport at once. A recipient keeps its slot for the whole
//! logical send, including backoff sleeps between attempts, so retries never
//! re-queue behind other targets.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::campaign::classifier::{classify, Decision};
use crate::campaign::{ActionButton, DispatchOutcome, Payload, RecipientId, SkipReason};
use crate::transport::Transport;

/// Sends batches through a transport under a concurrency cap.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    gate: Arc<Semaphore>,
    max_attempts: u32,
}

impl Dispatcher {
    /// Create a dispatcher allowing `concurrency_limit` sends in flight.
    ///
    /// Both the limit and `max_attempts` are raised to at least 1.
    pub fn new(transport: Arc<dyn Transport>, concurrency_limit: usize, max_attempts: u32) -> Self {
        Self {
            transport,
            gate: Arc::new(Semaphore::new(concurrency_limit.max(1))),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Dispatch to every target and wait until all outcomes are known.
    ///
    /// Outcomes are returned in target order; the sends themselves run in no
    /// particular order.
    pub async fn dispatch_batch(
        &self,
        targets: &[RecipientId],
        payload: &Payload,
        buttons: &[Vec<ActionButton>],
    ) -> Vec<(RecipientId, DispatchOutcome)> {
        let sends = targets
            .iter()
            .map(|&recipient| self.send_one(recipient, payload, buttons));
        join_all(sends).await
    }

    async fn send_one(
        &self,
        recipient: RecipientId,
        payload: &Payload,
        buttons: &[Vec<ActionButton>],
    ) -> (RecipientId, DispatchOutcome) {
        let _permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(recipient = recipient, error = %e, "dispatch_gate_closed");
                return (recipient, DispatchOutcome::Failed);
            }
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.transport.send(recipient, payload, buttons).await {
                Ok(_) => return (recipient, DispatchOutcome::Success),
                Err(err) => err,
            };

            match classify(&err, attempt, self.max_attempts) {
                Decision::Retry(backoff) => {
                    debug!(
                        recipient = recipient,
                        attempt = attempt,
                        error = %err,
                        backoff = ?backoff,
                        "send_retry_scheduled"
                    );
                    sleep(backoff).await;
                }
                Decision::Skip => {
                    debug!(recipient = recipient, error = %err, "send_skipped_unreachable");
                    return (recipient, DispatchOutcome::Skipped(SkipReason::Unreachable));
                }
                Decision::Fail => {
                    warn!(
                        recipient = recipient,
                        attempts = attempt,
                        error = %err,
                        "send_failed"
                    );
                    return (recipient, DispatchOutcome::Failed);
                }
            }
        }
    }
}

//! Scriptable, instrumented transport for engine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use super::{Ack, Transport, TransportError};
use crate::campaign::{ActionButton, Payload, RecipientId};

/// One observed send attempt.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub recipient: RecipientId,
    pub started: Instant,
    pub finished: Instant,
    pub ok: bool,
}

#[derive(Default)]
pub(crate) struct MockTransport {
    latency: Duration,
    scripted: Mutex<HashMap<RecipientId, VecDeque<TransportError>>>,
    always: Mutex<HashMap<RecipientId, TransportError>>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send takes `latency` on the (test) clock before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Queue `error` for the next send to `recipient`; later sends fall through.
    pub fn fail_once(&self, recipient: RecipientId, error: TransportError) {
        self.scripted
            .lock()
            .unwrap()
            .entry(recipient)
            .or_default()
            .push_back(error);
    }

    pub fn fail_always(&self, recipient: RecipientId, error: TransportError) {
        self.always.lock().unwrap().insert(recipient, error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, recipient: RecipientId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.recipient == recipient)
            .count()
    }

    pub fn called_recipients(&self) -> Vec<RecipientId> {
        let mut ids: Vec<_> = self.calls().iter().map(|c| c.recipient).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_result(&self, recipient: RecipientId) -> Result<Ack, TransportError> {
        if let Some(err) = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&recipient)
            .and_then(|queue| queue.pop_front())
        {
            return Err(err);
        }
        match self.always.lock().unwrap().get(&recipient) {
            Some(err) => Err(err.clone()),
            None => Ok(Ack {
                message_id: Some(recipient),
            }),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        recipient: RecipientId,
        _payload: &Payload,
        _buttons: &[Vec<ActionButton>],
    ) -> Result<Ack, TransportError> {
        let started = Instant::now();
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        let result = self.next_result(recipient);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(Call {
            recipient,
            started,
            finished: Instant::now(),
            ok: result.is_ok(),
        });
        result
    }
}

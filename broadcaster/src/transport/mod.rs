//! Transport capability: a single send of a payload to one recipient.
//!
//! The engine is agnostic to the channel behind it. Implementations report
//! failures as a [`TransportError`] tag, which the classifier maps to a retry
//! decision.

pub mod telegram;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::campaign::{ActionButton, Payload, RecipientId};

pub use telegram::TelegramTransport;

/// Acknowledgement of a delivered message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    /// Channel-side message id, when the channel reports one
    pub message_id: Option<i64>,
}

/// Failure of a single send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The channel asked us to wait before sending again.
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Network failure or timeout; expected to succeed on retry.
    #[error("Transient network failure")]
    Transient,

    /// The recipient forbids contact or is permanently invalid.
    #[error("Recipient permanently rejected delivery")]
    PermanentReject,

    /// The channel answered with something we do not recognise.
    #[error("Unknown transport error: {0}")]
    Unknown(String),

    /// A fault on our side: the request could not be built or the reply decoded.
    #[error("Internal transport error: {0}")]
    Internal(String),
}

/// Sends one payload to one recipient.
///
/// Each call is bounded by the implementation's own timeout, which must be
/// reported as [`TransportError::Transient`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        recipient: RecipientId,
        payload: &Payload,
        buttons: &[Vec<ActionButton>],
    ) -> Result<Ack, TransportError>;
}

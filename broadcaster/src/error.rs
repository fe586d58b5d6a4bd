//! Typed errors for the engine and its stores.
//!
//! Per-recipient transport failures never show up here: they are classified
//! into outcomes by the dispatcher. Only failures that stop a whole run (or a
//! control operation) are surfaced as errors.

use thiserror::Error;

use crate::campaign::InitiatorId;

/// Failure of a store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or read.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The backing store returned data that could not be decoded.
    #[error("Corrupt store data: {0}")]
    Corrupt(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a campaign operation.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// A store read failed before dispatch; nothing was sent.
    #[error("Campaign aborted: {0}")]
    Store(#[from] StoreError),

    /// Retry requested but the initiator has no pending failures.
    #[error("No pending failures for initiator {0}")]
    NoPendingFailures(InitiatorId),

    /// The initiator already has a run dispatching or reporting.
    #[error("Campaign already in progress for initiator {0}")]
    CampaignInProgress(InitiatorId),
}

impl CampaignError {
    /// Returns `true` if the run was refused because a store was unreachable.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unavailable(_) | StoreError::Io(_)))
    }
}

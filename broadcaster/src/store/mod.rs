//! Store collaborators: recipient lists and resumable campaign state.
//!
//! - [`RecipientStore`]: read-only source of recipients and blocked accounts
//! - [`CampaignStateStore`]: one live [`CampaignState`] per initiator
//!
//! Implementations:
//! - [`MemoryStore`]: both traits, in memory
//! - [`JsonRecipientStore`]: recipients from a JSON file
//! - [`FileStateStore`]: one JSON record per initiator on disk

pub mod file;
pub mod memory;
pub mod recipients;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::campaign::{CampaignState, InitiatorId, RecipientId};
use crate::error::StoreError;

pub use file::FileStateStore;
pub use memory::MemoryStore;
pub use recipients::JsonRecipientStore;

/// Source of campaign recipients.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Every known recipient, in storage order.
    async fn list(&self) -> Result<Vec<RecipientId>, StoreError>;

    /// Recipients known in advance to be undeliverable.
    async fn blocked_set(&self) -> Result<HashSet<RecipientId>, StoreError>;
}

/// Persistence for resumable campaign state.
///
/// Keyed by initiator. Implementations must:
/// - fully replace any previous state on [`save`](Self::save), never merge
/// - treat saving a state with no failed ids as [`clear`](Self::clear)
#[async_trait]
pub trait CampaignStateStore: Send + Sync {
    async fn save(&self, state: CampaignState) -> Result<(), StoreError>;

    async fn load(&self, initiator: InitiatorId) -> Result<Option<CampaignState>, StoreError>;

    async fn clear(&self, initiator: InitiatorId) -> Result<(), StoreError>;
}

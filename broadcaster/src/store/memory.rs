//! In-memory stores.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CampaignStateStore, RecipientStore};
use crate::campaign::{CampaignState, InitiatorId, RecipientId};
use crate::error::StoreError;

/// Recipients, blocked accounts and campaign state held in memory.
#[derive(Default)]
pub struct MemoryStore {
    recipients: RwLock<Vec<RecipientId>>,
    blocked: RwLock<HashSet<RecipientId>>,
    states: RwLock<HashMap<InitiatorId, CampaignState>>,
    unavailable: RwLock<bool>,
    writes_failing: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipients(
        recipients: impl IntoIterator<Item = RecipientId>,
        blocked: impl IntoIterator<Item = RecipientId>,
    ) -> Self {
        Self {
            recipients: RwLock::new(recipients.into_iter().collect()),
            blocked: RwLock::new(blocked.into_iter().collect()),
            ..Self::default()
        }
    }

    pub async fn block(&self, recipient: RecipientId) {
        self.blocked.write().await.insert(recipient);
    }

    /// Make every recipient read fail with [`StoreError::Unavailable`].
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Make every campaign state save or clear fail with [`StoreError::Unavailable`].
    pub async fn set_writes_failing(&self, failing: bool) {
        *self.writes_failing.write().await = failing;
    }

    async fn check_writable(&self) -> Result<(), StoreError> {
        if *self.writes_failing.read().await {
            return Err(StoreError::Unavailable("memory store read-only".to_string()));
        }
        Ok(())
    }

    async fn check_available(&self) -> Result<(), StoreError> {
        if *self.unavailable.read().await {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecipientStore for MemoryStore {
    async fn list(&self) -> Result<Vec<RecipientId>, StoreError> {
        self.check_available().await?;
        Ok(self.recipients.read().await.clone())
    }

    async fn blocked_set(&self) -> Result<HashSet<RecipientId>, StoreError> {
        self.check_available().await?;
        Ok(self.blocked.read().await.clone())
    }
}

#[async_trait]
impl CampaignStateStore for MemoryStore {
    async fn save(&self, state: CampaignState) -> Result<(), StoreError> {
        self.check_writable().await?;
        let mut states = self.states.write().await;
        if state.failed.is_empty() {
            states.remove(&state.initiator_id);
        } else {
            states.insert(state.initiator_id, state);
        }
        Ok(())
    }

    async fn load(&self, initiator: InitiatorId) -> Result<Option<CampaignState>, StoreError> {
        Ok(self.states.read().await.get(&initiator).cloned())
    }

    async fn clear(&self, initiator: InitiatorId) -> Result<(), StoreError> {
        self.check_writable().await?;
        self.states.write().await.remove(&initiator);
        Ok(())
    }
}

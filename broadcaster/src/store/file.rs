//! Campaign state persisted as one JSON record per initiator.
//!
//! Layout:
//!
//! ```text
//! <dir>/campaign_<initiator>.json
//! {"payload": {...}, "failed": [ids], "buttons": [[{text, url}]], "timestamp": "..."}
//! ```
//!
//! Records are written to a temporary file and renamed into place, so a reader
//! never observes a partially written record.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use super::CampaignStateStore;
use crate::campaign::{ButtonRows, CampaignState, InitiatorId, Payload, RecipientId};
use crate::error::StoreError;

/// On-disk shape of a campaign state. The initiator is encoded in the file name.
#[derive(Debug, Serialize, Deserialize)]
struct CampaignRecord {
    payload: Payload,
    #[serde(default)]
    failed: Vec<RecipientId>,
    #[serde(default)]
    buttons: ButtonRows,
    timestamp: DateTime<Utc>,
}

/// Directory-backed [`CampaignStateStore`].
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, initiator: InitiatorId) -> PathBuf {
        self.dir.join(format!("campaign_{initiator}.json"))
    }
}

#[async_trait]
impl CampaignStateStore for FileStateStore {
    async fn save(&self, state: CampaignState) -> Result<(), StoreError> {
        if state.failed.is_empty() {
            return self.clear(state.initiator_id).await;
        }

        let record = CampaignRecord {
            payload: state.payload,
            failed: state.failed,
            buttons: state.buttons,
            timestamp: state.timestamp,
        };
        let body = serde_json::to_vec(&record)
            .map_err(|e| StoreError::Corrupt(format!("Failed to serialize campaign state: {e}")))?;

        fs::create_dir_all(&self.dir).await?;
        let path = self.record_path(state.initiator_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &body).await?;
        fs::rename(&tmp, &path).await?;

        info!(
            initiator = state.initiator_id,
            failed = record.failed.len(),
            path = %path.display(),
            "campaign_state_saved"
        );
        Ok(())
    }

    async fn load(&self, initiator: InitiatorId) -> Result<Option<CampaignState>, StoreError> {
        let path = self.record_path(initiator);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        // An unreadable record is treated as no pending campaign.
        let record: CampaignRecord = match serde_json::from_slice(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    initiator = initiator,
                    path = %path.display(),
                    error = %e,
                    "campaign_state_unreadable"
                );
                return Ok(None);
            }
        };

        if record.failed.is_empty() {
            return Ok(None);
        }

        Ok(Some(CampaignState {
            initiator_id: initiator,
            payload: record.payload,
            failed: record.failed,
            buttons: record.buttons,
            timestamp: record.timestamp,
        }))
    }

    async fn clear(&self, initiator: InitiatorId) -> Result<(), StoreError> {
        match fs::remove_file(self.record_path(initiator)).await {
            Ok(()) => {
                info!(initiator = initiator, "campaign_state_cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{ActionButton, Media};

    fn sample_state(initiator: InitiatorId, failed: Vec<RecipientId>) -> CampaignState {
        CampaignState::new(
            initiator,
            Payload::Video(Media {
                file_id: "BAACAgIAAxk".to_string(),
                caption: "<b>Trailer</b>".to_string(),
            }),
            failed,
            vec![vec![ActionButton::new("Watch", "https://t.me/example")]],
        )
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        let state = sample_state(7, vec![3, 1, 2]);

        store.save(state.clone()).await.unwrap();
        let loaded = store.load(7).await.unwrap().unwrap();

        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_record_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        store.save(sample_state(7, vec![5])).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("campaign_7.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["payload"]["type"], "video");
        assert_eq!(value["failed"], serde_json::json!([5]));
        assert_eq!(value["buttons"][0][0]["url"], "https://t.me/example");
        assert!(value["timestamp"].is_string());
        assert!(value.get("initiator_id").is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        store.save(sample_state(7, vec![1, 2, 3])).await.unwrap();
        store.save(sample_state(7, vec![9])).await.unwrap();

        assert_eq!(store.load(7).await.unwrap().unwrap().failed, vec![9]);
    }

    #[tokio::test]
    async fn test_empty_failed_deletes_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        store.save(sample_state(7, vec![1])).await.unwrap();
        store.save(sample_state(7, vec![])).await.unwrap();

        assert!(store.load(7).await.unwrap().is_none());
        assert!(!dir.path().join("campaign_7.json").exists());
    }

    #[tokio::test]
    async fn test_missing_record_and_clear_are_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("not-yet-created"));

        assert!(store.load(1).await.unwrap().is_none());
        store.clear(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_record_loads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("campaign_3.json"), b"{not json").unwrap();
        let store = FileStateStore::new(dir.path());

        assert!(store.load(3).await.unwrap().is_none());
    }
}

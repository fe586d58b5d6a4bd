//! Recipient list read from a JSON file.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs;

use super::RecipientStore;
use crate::campaign::RecipientId;
use crate::error::StoreError;

/// File contents: `{"users": [ids], "blocked": [ids]}`.
#[derive(Debug, Deserialize)]
struct RecipientFile {
    #[serde(default)]
    users: Vec<RecipientId>,
    #[serde(default)]
    blocked: Vec<RecipientId>,
}

/// [`RecipientStore`] backed by a JSON file.
///
/// The file is re-read on every call so each run sees a fresh snapshot.
#[derive(Debug, Clone)]
pub struct JsonRecipientStore {
    path: PathBuf,
}

impl JsonRecipientStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<RecipientFile, StoreError> {
        let raw = fs::read(&self.path).await.map_err(|e| {
            StoreError::Unavailable(format!("{}: {e}", self.path.display()))
        })?;
        serde_json::from_slice(&raw)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl RecipientStore for JsonRecipientStore {
    async fn list(&self) -> Result<Vec<RecipientId>, StoreError> {
        Ok(self.read().await?.users)
    }

    async fn blocked_set(&self) -> Result<HashSet<RecipientId>, StoreError> {
        Ok(self.read().await?.blocked.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_users_and_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipients.json");
        std::fs::write(&path, r#"{"users": [5, 1, 3], "blocked": [3]}"#).unwrap();
        let store = JsonRecipientStore::new(&path);

        assert_eq!(store.list().await.unwrap(), vec![5, 1, 3]);
        assert_eq!(store.blocked_set().await.unwrap(), HashSet::from([3]));
    }

    #[tokio::test]
    async fn test_blocked_defaults_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipients.json");
        std::fs::write(&path, r#"{"users": [1]}"#).unwrap();

        assert!(JsonRecipientStore::new(&path).blocked_set().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecipientStore::new(dir.path().join("absent.json"));

        assert!(matches!(store.list().await, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_malformed_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipients.json");
        std::fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(
            JsonRecipientStore::new(&path).blocked_set().await,
            Err(StoreError::Corrupt(_))
        ));
    }
}

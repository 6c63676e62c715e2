//! Durable storage for the context store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use shivai_protocols::{ContextEntry, HistoryRecord};

use crate::error::ContextResult;

/// Serializable form of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedContext {
    #[serde(default)]
    pub entries: Vec<ContextEntry>,
    /// Oldest first.
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
}

/// Read/write contract for a storage engine.
#[async_trait]
pub trait ContextPersistence: Send + Sync {
    /// Load the previous state, `None` when nothing was saved yet.
    async fn load(&self) -> ContextResult<Option<PersistedContext>>;

    async fn save(&self, context: &PersistedContext) -> ContextResult<()>;
}

/// Stores the context as one JSON document.
pub struct JsonFileContextPersistence {
    path: PathBuf,
}

impl JsonFileContextPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ContextPersistence for JsonFileContextPersistence {
    async fn load(&self) -> ContextResult<Option<PersistedContext>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(&self.path).await?;
        let context: PersistedContext = serde_json::from_str(&json)?;
        debug!(
            "Loaded context from {:?}: {} entries, {} history records",
            self.path,
            context.entries.len(),
            context.history.len()
        );
        Ok(Some(context))
    }

    async fn save(&self, context: &PersistedContext) -> ContextResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(context)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Saved context to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shivai_protocols::{IntentCategory, OutcomeStatus};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let persistence = JsonFileContextPersistence::new(dir.path().join("context.json"));
        assert!(persistence.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let persistence =
            JsonFileContextPersistence::new(dir.path().join("nested").join("context.json"));

        let context = PersistedContext {
            entries: vec![ContextEntry {
                key: "last_app".into(),
                value: serde_json::json!("camera"),
                last_updated: Utc::now(),
                access_count: 4,
            }],
            history: vec![HistoryRecord::new(
                uuid::Uuid::new_v4(),
                IntentCategory::AppOpen,
                OutcomeStatus::Succeeded,
                None,
            )],
        };

        persistence.save(&context).await.unwrap();
        let loaded = persistence.load().await.unwrap().unwrap();
        assert_eq!(loaded, context);
        assert!(!dir.path().join("nested").join("context.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("context.json");
        tokio::fs::write(&path, "{ nope").await.unwrap();
        let persistence = JsonFileContextPersistence::new(path);
        assert!(persistence.load().await.is_err());
    }
}

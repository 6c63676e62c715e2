//! In-memory context store.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use shivai_config::ContextConfig;
use shivai_protocols::{
    ContextEntry, ContextSnapshot, HistoryRecord, HistoryStats, IntentCategory,
};

use crate::error::{ContextError, ContextResult};
use crate::persistence::{ContextPersistence, PersistedContext};

struct StoredEntry {
    value: serde_json::Value,
    last_updated: DateTime<Utc>,
    access_count: AtomicU64,
}

#[derive(Default)]
struct StoreState {
    entries: HashMap<String, StoredEntry>,
    /// Oldest at the front.
    history: VecDeque<HistoryRecord>,
}

/// Key/value memory plus bounded task history.
///
/// All mutation goes through a single write lock; reads share the lock and
/// always observe a consistent state.
pub struct ContextStore {
    state: RwLock<StoreState>,
    retention: usize,
    recent_window: usize,
    persistence: Option<Arc<dyn ContextPersistence>>,
}

impl ContextStore {
    pub fn new(retention: usize, recent_window: usize) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            retention,
            recent_window,
            persistence: None,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.history_retention_count, config.recent_window)
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn ContextPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Restore previously saved state, if a persistence backend is set.
    pub async fn open(self) -> ContextResult<Self> {
        let Some(persistence) = self.persistence.clone() else {
            return Ok(self);
        };

        if let Some(saved) = persistence.load().await? {
            let mut state = self.state.write();
            for entry in saved.entries {
                state.entries.insert(
                    entry.key,
                    StoredEntry {
                        value: entry.value,
                        last_updated: entry.last_updated,
                        access_count: AtomicU64::new(entry.access_count),
                    },
                );
            }
            state.history = saved.history.into();
            while state.history.len() > self.retention {
                state.history.pop_front();
            }
            info!(
                "Context restored: {} entries, {} history records",
                state.entries.len(),
                state.history.len()
            );
        }
        Ok(self)
    }

    /// Save the current state through the persistence backend.
    pub async fn flush(&self) -> ContextResult<()> {
        let Some(persistence) = self.persistence.as_ref() else {
            return Ok(());
        };
        let data = self.export();
        persistence.save(&data).await
    }

    /// Copy of the whole store in its serializable form.
    pub fn export(&self) -> PersistedContext {
        let state = self.state.read();
        let mut entries: Vec<ContextEntry> = state
            .entries
            .iter()
            .map(|(key, entry)| to_context_entry(key, entry))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        PersistedContext {
            entries,
            history: state.history.iter().cloned().collect(),
        }
    }

    /// Read a value, counting the access.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let state = self.state.read();
        state.entries.get(key).map(|entry| {
            entry.access_count.fetch_add(1, Ordering::Relaxed);
            entry.value.clone()
        })
    }

    /// Read and deserialize a value.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> ContextResult<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ContextError::InvalidValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Insert or overwrite a value. The access count of an existing key is kept.
    pub fn set<T: Serialize>(&self, key: impl Into<String>, value: T) -> ContextResult<()> {
        let key = key.into();
        let value = serde_json::to_value(value)?;
        let mut state = self.state.write();
        match state.entries.get_mut(&key) {
            Some(entry) => {
                entry.value = value;
                entry.last_updated = Utc::now();
            }
            None => {
                state.entries.insert(
                    key.clone(),
                    StoredEntry {
                        value,
                        last_updated: Utc::now(),
                        access_count: AtomicU64::new(0),
                    },
                );
            }
        }
        debug!("Context key set: {}", key);
        Ok(())
    }

    /// Metadata view of a key. Does not count as an access.
    pub fn entry(&self, key: &str) -> Option<ContextEntry> {
        let state = self.state.read();
        state.entries.get(key).map(|entry| to_context_entry(key, entry))
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.read().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Append a history record, evicting the oldest beyond retention.
    pub fn record_history(&self, record: HistoryRecord) {
        let mut state = self.state.write();
        state.history.push_back(record);
        let mut evicted = 0;
        while state.history.len() > self.retention {
            state.history.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            debug!("Evicted {} history records past retention", evicted);
        }
    }

    /// Up to `limit` records, most recent first, optionally for one category.
    pub fn recent(&self, category: Option<IntentCategory>, limit: usize) -> Vec<HistoryRecord> {
        let state = self.state.read();
        state
            .history
            .iter()
            .rev()
            .filter(|r| category.is_none_or(|c| r.intent_category == c))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.state.read().history.len()
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Counts over the retained history.
    pub fn stats(&self) -> HistoryStats {
        let state = self.state.read();
        let mut stats = HistoryStats::default();
        for record in &state.history {
            stats.record(record.outcome);
        }
        stats
    }

    /// Consistent read-only view of entries and recent history.
    pub fn snapshot(&self) -> ContextSnapshot {
        let state = self.state.read();
        let entries: BTreeMap<String, serde_json::Value> = state
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect();
        let recent: Vec<HistoryRecord> = state
            .history
            .iter()
            .rev()
            .take(self.recent_window)
            .cloned()
            .collect();
        let mut stats = HistoryStats::default();
        for record in &state.history {
            stats.record(record.outcome);
        }
        ContextSnapshot {
            entries,
            recent,
            stats,
            taken_at: Utc::now(),
        }
    }

    /// Most frequent category in the recent window.
    pub fn dominant_category(&self) -> Option<IntentCategory> {
        self.snapshot().dominant_category()
    }
}

fn to_context_entry(key: &str, entry: &StoredEntry) -> ContextEntry {
    ContextEntry {
        key: key.to_string(),
        value: entry.value.clone(),
        last_updated: entry.last_updated,
        access_count: entry.access_count.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

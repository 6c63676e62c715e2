//! Context and history records shared between the store and handlers.

use crate::intent::IntentCategory;
use crate::outcome::{FailureKind, OutcomeStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Metadata view of one stored key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub last_updated: DateTime<Utc>,
    pub access_count: u64,
}

/// One terminal work item as remembered by the context store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub work_item_id: Uuid,
    pub intent_category: IntentCategory,
    pub outcome: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(
        work_item_id: Uuid,
        intent_category: IntentCategory,
        outcome: OutcomeStatus,
        failure: Option<FailureKind>,
    ) -> Self {
        Self {
            work_item_id,
            intent_category,
            outcome,
            failure,
            timestamp: Utc::now(),
        }
    }
}

/// Aggregate counts over the retained history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl HistoryStats {
    pub fn record(&mut self, outcome: OutcomeStatus) {
        self.total += 1;
        match outcome {
            OutcomeStatus::Succeeded => self.succeeded += 1,
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::Cancelled => self.cancelled += 1,
        }
    }

    /// Share of retained items that succeeded, `0.0` when empty.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }
}

/// Read-only copy of the store handed to the parser and to handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub entries: BTreeMap<String, serde_json::Value>,
    /// Most recent records first.
    pub recent: Vec<HistoryRecord>,
    pub stats: HistoryStats,
    pub taken_at: DateTime<Utc>,
}

impl ContextSnapshot {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
            recent: Vec::new(),
            stats: HistoryStats::default(),
            taken_at: Utc::now(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    /// Most frequent known category in the recent window.
    ///
    /// Ties go to the category seen most recently.
    pub fn dominant_category(&self) -> Option<IntentCategory> {
        let mut counts: HashMap<IntentCategory, (usize, usize)> = HashMap::new();
        for (pos, record) in self.recent.iter().enumerate() {
            if record.intent_category.is_unknown() {
                continue;
            }
            let entry = counts.entry(record.intent_category).or_insert((0, pos));
            entry.0 += 1;
        }
        counts
            .into_iter()
            .max_by(|(_, (ca, pa)), (_, (cb, pb))| ca.cmp(cb).then(pb.cmp(pa)))
            .map(|(category, _)| category)
    }
}

impl Default for ContextSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

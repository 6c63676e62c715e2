//! Stable ready queue.
//!
//! Items are keyed by `(priority level, eligible_at, retry, sequence)`.
//! Dispatch takes the lowest level that has an eligible item; within a level
//! the earliest eligibility wins, a fresh item goes before a retry that
//! became eligible at the same instant, and remaining ties keep push order.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use uuid::Uuid;

use crate::item::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    level: u8,
    eligible_at: Duration,
    retry: bool,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct ReadyQueue {
    entries: BTreeMap<QueueKey, Uuid>,
    keys: HashMap<Uuid, QueueKey>,
    next_seq: u64,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fresh item. Re-pushing an id that is already queued moves it.
    pub fn push(&mut self, id: Uuid, priority: Priority, eligible_at: Duration) {
        self.insert(id, priority, eligible_at, false);
    }

    /// Requeue an item after a failed attempt.
    pub fn push_retry(&mut self, id: Uuid, priority: Priority, eligible_at: Duration) {
        self.insert(id, priority, eligible_at, true);
    }

    fn insert(&mut self, id: Uuid, priority: Priority, eligible_at: Duration, retry: bool) {
        self.remove(id);
        let key = QueueKey {
            level: priority.level(),
            eligible_at,
            retry,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(key, id);
        self.keys.insert(id, key);
    }

    /// Remove and return the next item eligible at `now`.
    pub fn pop_ready(&mut self, now: Duration) -> Option<Uuid> {
        let key = Priority::ALL.iter().find_map(|p| {
            let level = p.level();
            let start = QueueKey {
                level,
                eligible_at: Duration::ZERO,
                retry: false,
                seq: 0,
            };
            self.entries
                .range(start..)
                .next()
                .filter(|(key, _)| key.level == level && key.eligible_at <= now)
                .map(|(key, _)| *key)
        })?;

        let id = self.entries.remove(&key)?;
        self.keys.remove(&id);
        Some(id)
    }

    /// Earliest eligibility among queued items.
    pub fn next_eligible_at(&self) -> Option<Duration> {
        let mut earliest: Option<Duration> = None;
        for p in Priority::ALL {
            let level = p.level();
            let start = QueueKey {
                level,
                eligible_at: Duration::ZERO,
                retry: false,
                seq: 0,
            };
            if let Some((key, _)) = self.entries.range(start..).next() {
                if key.level == level {
                    earliest = Some(earliest.map_or(key.eligible_at, |e| e.min(key.eligible_at)));
                }
            }
        }
        earliest
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        match self.keys.remove(&id) {
            Some(key) => self.entries.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.keys.contains_key(&id)
    }

    /// Remove every item, in dispatch order.
    pub fn drain(&mut self) -> Vec<Uuid> {
        self.keys.clear();
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

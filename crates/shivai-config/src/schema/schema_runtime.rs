//! Scheduler, context and parser settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::default_true;

/// Task scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_max_concurrent_workers")]
    pub max_concurrent_workers: usize,

    #[serde(default = "default_task_timeout_ms")]
    pub default_task_timeout_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub retry_backoff_base_ms: u64,

    #[serde(default = "default_backoff_cap_ms")]
    pub retry_backoff_cap_ms: u64,

    /// Maximum queued items, 0 for unlimited.
    #[serde(default)]
    pub max_queue_size: usize,

    /// Terminal items kept for status queries.
    #[serde(default = "default_completed_retention")]
    pub completed_retention: usize,

    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl SchedulerConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.default_task_timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_base_ms)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_cap_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workers: default_max_concurrent_workers(),
            default_task_timeout_ms: default_task_timeout_ms(),
            default_max_attempts: default_max_attempts(),
            retry_backoff_base_ms: default_backoff_base_ms(),
            retry_backoff_cap_ms: default_backoff_cap_ms(),
            max_queue_size: 0,
            completed_retention: default_completed_retention(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

fn default_max_concurrent_workers() -> usize {
    3
}

fn default_task_timeout_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_cap_ms() -> u64 {
    30_000
}

fn default_completed_retention() -> usize {
    1_000
}

fn default_shutdown_grace_ms() -> u64 {
    5_000
}

/// Context store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_history_retention")]
    pub history_retention_count: usize,

    /// History records included in snapshots.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    #[serde(default = "default_true")]
    pub persist: bool,

    /// Persistence file; `<data_dir>/context.json` when unset.
    #[serde(default)]
    pub persist_path: Option<PathBuf>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_retention_count: default_history_retention(),
            recent_window: default_recent_window(),
            persist: true,
            persist_path: None,
        }
    }
}

fn default_history_retention() -> usize {
    500
}

fn default_recent_window() -> usize {
    20
}

/// Intent parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Matches below this confidence are reported as `unknown`.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Minimum share of tokens from each lexicon for `mixed`.
    #[serde(default = "default_mixed_min_share")]
    pub mixed_language_min_share: f32,

    /// A tied candidate at or above this confidence is never overridden by
    /// the context hint.
    #[serde(default = "default_hint_ceiling")]
    pub hint_confidence_ceiling: f32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            mixed_language_min_share: default_mixed_min_share(),
            hint_confidence_ceiling: default_hint_ceiling(),
        }
    }
}

fn default_confidence_threshold() -> f32 {
    0.4
}

fn default_mixed_min_share() -> f32 {
    0.2
}

fn default_hint_ceiling() -> f32 {
    0.75
}

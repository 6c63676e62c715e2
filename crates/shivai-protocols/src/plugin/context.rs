//! Context passed to handlers for each attempt.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::context::ContextSnapshot;

/// Per-attempt view handed to [`CommandHandler::handle`](super::CommandHandler::handle).
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Work item being executed.
    pub work_item_id: Uuid,

    /// 1-based attempt number.
    pub attempt: u32,

    /// Plugin the capability resolved to.
    pub plugin: String,

    /// Plugin configuration.
    pub config: serde_json::Value,

    /// Context store contents at dispatch time.
    pub snapshot: Arc<ContextSnapshot>,

    cancel: CancellationToken,
}

impl HandlerContext {
    pub fn new(
        work_item_id: Uuid,
        attempt: u32,
        plugin: impl Into<String>,
        config: serde_json::Value,
        snapshot: Arc<ContextSnapshot>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            work_item_id,
            attempt,
            plugin: plugin.into(),
            config,
            snapshot,
            cancel,
        }
    }

    /// Whether the caller asked for this work item to be cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Get a configuration value.
    pub fn get_config<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

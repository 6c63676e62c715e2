//! Handler traits implemented by plugins.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::{HandlerContext, PluginDescriptor};
use crate::error::{HandlerError, PluginError};
use crate::intent::Intent;

/// Capability implementation provided by a plugin.
///
/// The registry calls [`initialize`](CommandHandler::initialize) once per
/// load cycle before the plugin is enabled, and
/// [`shutdown`](CommandHandler::shutdown) when it is unloaded.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    async fn initialize(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Capabilities this handler actually serves.
    fn capabilities(&self) -> BTreeSet<String>;

    /// Execute one work item. The returned value becomes the success payload.
    async fn handle(
        &self,
        intent: &Intent,
        ctx: &HandlerContext,
    ) -> Result<serde_json::Value, HandlerError>;

    async fn shutdown(&self) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Builds a handler for a plugin's `entry_reference`.
pub trait HandlerFactory: Send + Sync + 'static {
    fn create(&self, descriptor: &PluginDescriptor) -> Result<Arc<dyn CommandHandler>, HandlerError>;
}

impl<F> HandlerFactory for F
where
    F: Fn(&PluginDescriptor) -> Result<Arc<dyn CommandHandler>, HandlerError> + Send + Sync + 'static,
{
    fn create(&self, descriptor: &PluginDescriptor) -> Result<Arc<dyn CommandHandler>, HandlerError> {
        self(descriptor)
    }
}

/// A capability resolved to a concrete enabled handler.
#[derive(Clone)]
pub struct ResolvedHandler {
    pub plugin: String,
    pub handler: Arc<dyn CommandHandler>,
    pub config: serde_json::Value,
}

impl std::fmt::Debug for ResolvedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedHandler")
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

/// Maps a capability name to an enabled handler at dispatch time.
pub trait HandlerResolver: Send + Sync {
    fn resolve(&self, capability: &str) -> Result<ResolvedHandler, PluginError>;
}

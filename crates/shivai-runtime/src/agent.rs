//! Agent orchestrator.
//!
//! Wires the parser, plugin registry, scheduler and context store together:
//! an utterance is parsed, routed to a capability, submitted as a work item
//! and its outcome delivered back to the caller.

use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use shivai_config::{Config, ConfigLoader, ConfigValidator};
use shivai_context::{ContextPersistence, ContextStore, JsonFileContextPersistence};
use shivai_core::{BootReport, DiscoveryReport, HandlerCatalog, PluginRegistry};
use shivai_parser::IntentParser;
use shivai_protocols::{
    CommandHandler, HandlerError, HandlerFactory, Intent, Outcome, PluginDescriptor,
};
use shivai_workqueue::{Clock, Scheduler, SystemClock, WorkHandle, WorkItem};

use crate::error::AgentResult;
use crate::routing::RoutingTable;
use crate::session::{Reply, UtteranceSink, UtteranceSource};
use crate::system::{SYSTEM_ENTRY, SystemHandler, system_manifest};

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;

/// Builds an [`Agent`] from configuration and a handler catalog.
pub struct AgentBuilder {
    config: Config,
    catalog: HandlerCatalog,
    clock: Option<Arc<dyn Clock>>,
    persistence: Option<Arc<dyn ContextPersistence>>,
}

impl AgentBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            catalog: HandlerCatalog::new(),
            clock: None,
            persistence: None,
        }
    }

    /// Replace the handler catalog.
    pub fn catalog(mut self, catalog: HandlerCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Register a handler factory for an entry reference.
    pub fn handler(self, entry_reference: impl Into<String>, factory: impl HandlerFactory) -> Self {
        self.catalog.register(entry_reference, factory);
        self
    }

    /// Clock used for retry eligibility.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override the persistence backend chosen from `[context]`.
    pub fn persistence(mut self, persistence: Arc<dyn ContextPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Validate the config, restore the context, discover and boot plugins,
    /// and start the scheduler.
    pub async fn build(self) -> AgentResult<Agent> {
        let Self {
            config,
            catalog,
            clock,
            persistence,
        } = self;

        let validation = ConfigValidator::validate(&config)?;
        for warning in validation.into_result()? {
            warn!("Config warning at {}: {}", warning.path, warning.message);
        }

        let mut context = ContextStore::from_config(&config.context);
        if let Some(persistence) = persistence.or_else(|| default_persistence(&config)) {
            context = context.with_persistence(persistence);
        }
        let context = Arc::new(context.open().await?);

        let scheduler_cell = Arc::new(OnceCell::new());
        let cell = scheduler_cell.clone();
        catalog.register(
            SYSTEM_ENTRY,
            move |_: &PluginDescriptor| -> Result<Arc<dyn CommandHandler>, HandlerError> {
                Ok(Arc::new(SystemHandler::new(cell.clone())))
            },
        );

        let registry = Arc::new(PluginRegistry::with_config(
            Arc::new(catalog),
            config.plugins.clone(),
        ));
        registry.register(system_manifest())?;

        let discovery = if config.plugins.auto_load {
            let dirs: Vec<PathBuf> = config
                .plugins
                .dirs
                .iter()
                .map(|d| ConfigLoader::expand_pathbuf(d))
                .collect();
            registry.discover(&dirs).await
        } else {
            DiscoveryReport::default()
        };
        for rejected in &discovery.rejected {
            warn!(
                "Rejected plugin manifest {}: {}",
                rejected.origin, rejected.reason
            );
        }

        let boot = registry.boot().await;
        for failure in &boot.failed {
            warn!("Plugin {} not enabled: {}", failure.plugin, failure.reason);
        }

        let scheduler = Scheduler::with_clock(
            config.scheduler.clone(),
            registry.clone(),
            context.clone(),
            clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
        );
        scheduler.start();
        let _ = scheduler_cell.set(scheduler.clone());

        info!(
            "Agent '{}' ready: {} plugins enabled",
            config.agent.name,
            boot.enabled.len()
        );

        Ok(Agent {
            parser: IntentParser::from_config(&config.parser),
            routing: RoutingTable::from_config(&config),
            config,
            registry,
            scheduler,
            context,
            discovery,
            boot,
        })
    }
}

fn default_persistence(config: &Config) -> Option<Arc<dyn ContextPersistence>> {
    if !config.context.persist {
        return None;
    }
    let path = match &config.context.persist_path {
        Some(path) => ConfigLoader::expand_pathbuf(path),
        None => ConfigLoader::expand_pathbuf(&config.agent.data_dir).join("context.json"),
    };
    Some(Arc::new(JsonFileContextPersistence::new(path)))
}

/// A running command agent.
pub struct Agent {
    config: Config,
    parser: IntentParser,
    routing: RoutingTable,
    registry: Arc<PluginRegistry>,
    scheduler: Scheduler,
    context: Arc<ContextStore>,
    discovery: DiscoveryReport,
    boot: BootReport,
}

impl Agent {
    pub fn builder(config: Config) -> AgentBuilder {
        AgentBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn context(&self) -> &Arc<ContextStore> {
        &self.context
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn discovery_report(&self) -> &DiscoveryReport {
        &self.discovery
    }

    pub fn boot_report(&self) -> &BootReport {
        &self.boot
    }

    /// Classify an utterance using the current context as a hint.
    pub fn parse(&self, text: &str) -> Intent {
        let snapshot = self.context.snapshot();
        self.parser.parse(text, Some(&snapshot))
    }

    /// Work item for an intent, routed and prioritized by category.
    pub fn work_item(&self, intent: Intent) -> WorkItem {
        let category = intent.category();
        let capability = self.routing.capability_for(category).to_string();
        self.scheduler
            .work_item(intent, capability)
            .with_priority(self.routing.priority_for(category))
    }

    /// Parse and submit an utterance.
    pub fn submit_utterance(&self, text: &str) -> AgentResult<WorkHandle> {
        let intent = self.parse(text);
        debug!(
            "Parsed {:?} as {} ({:.2}, {})",
            text,
            intent.category(),
            intent.confidence(),
            intent.language()
        );
        self.submit_intent(intent)
    }

    pub fn submit_intent(&self, intent: Intent) -> AgentResult<WorkHandle> {
        let item = self.work_item(intent);
        Ok(self.scheduler.submit(item)?)
    }

    pub fn cancel(&self, handle: WorkHandle) -> bool {
        self.scheduler.cancel(handle)
    }

    pub fn get_status(&self, handle: WorkHandle) -> Option<WorkItem> {
        self.scheduler.status(handle)
    }

    pub async fn await_result(&self, handle: WorkHandle, timeout: Duration) -> AgentResult<Outcome> {
        Ok(self.scheduler.await_result(handle, timeout).await?)
    }

    pub fn on_complete<F>(&self, handle: WorkHandle, callback: F) -> AgentResult<()>
    where
        F: FnOnce(&WorkItem) + Send + 'static,
    {
        Ok(self.scheduler.on_complete(handle, callback)?)
    }

    /// Upper bound on how long one utterance can take, retries included.
    pub fn response_timeout(&self) -> Duration {
        let scheduler = &self.config.scheduler;
        let attempts = scheduler.default_max_attempts.max(1);
        scheduler
            .task_timeout()
            .checked_add(scheduler.backoff_cap())
            .and_then(|per_attempt| per_attempt.checked_mul(attempts))
            .unwrap_or(Duration::MAX)
    }

    /// Submit an utterance and wait for its outcome.
    pub async fn handle_utterance(&self, text: &str) -> AgentResult<Reply> {
        let intent = self.parse(text);
        let item = self.work_item(intent.clone());
        let capability = item.target_capability.clone();
        let handle = self.scheduler.submit(item)?;
        let outcome = self.await_result(handle, self.response_timeout()).await?;
        Ok(Reply {
            handle,
            intent,
            capability,
            outcome,
        })
    }

    /// Answer utterances from `source` until it is exhausted or a handler
    /// asks to exit. Returns the number of utterances handled.
    pub async fn run_session(
        &self,
        source: &mut dyn UtteranceSource,
        sink: &mut dyn UtteranceSink,
    ) -> AgentResult<usize> {
        let mut handled = 0;
        while let Some(text) = source.next_utterance().await? {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let reply = self.handle_utterance(text).await?;
            handled += 1;
            sink.deliver(&reply).await?;
            if reply.is_exit() {
                info!("Session ended by exit command");
                break;
            }
        }
        self.context.flush().await?;
        Ok(handled)
    }

    /// Stop the scheduler, unload plugins and save the context.
    pub async fn shutdown(&self) -> AgentResult<()> {
        info!("Shutting down agent '{}'", self.config.agent.name);
        self.scheduler
            .shutdown(self.config.scheduler.shutdown_grace())
            .await;
        self.registry.shutdown().await;
        self.context.flush().await?;
        Ok(())
    }
}

//! Plugin registry.
//!
//! Owns every plugin's descriptor, lifecycle state and handler. Lifecycle
//! operations are serialized per plugin name; capability resolution only
//! takes a short read lock and never waits on a lifecycle operation.

mod lifecycle;
mod slot;

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use shivai_config::PluginsConfig;
use shivai_protocols::{
    HandlerResolver, PluginDescriptor, PluginError, PluginManifest, PluginState, ResolvedHandler,
};

use crate::catalog::HandlerCatalog;
use crate::discovery::ManifestLoader;
use crate::graph::DependencyGraph;
use crate::report::{DiscoveryReport, PluginInfo, RejectedManifest};
use slot::PluginSlot;

/// How [`PluginRegistry::unload`] treats enabled dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnloadMode {
    /// Refuse with `PluginInUse`.
    #[default]
    Strict,
    /// Disable dependents first, deepest dependent first.
    Cascade,
}

#[derive(Default)]
struct Arena {
    slots: Vec<Arc<PluginSlot>>,
    index: HashMap<String, usize>,
}

impl Arena {
    fn get(&self, name: &str) -> Option<&Arc<PluginSlot>> {
        self.index.get(name).map(|&i| &self.slots[i])
    }
}

/// Registry of plugins and their lifecycle.
pub struct PluginRegistry {
    catalog: Arc<HandlerCatalog>,
    config: PluginsConfig,
    arena: RwLock<Arena>,
    /// Named manifests that failed validation.
    rejected: RwLock<HashMap<String, String>>,
    locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    /// Plugins with an enable in progress or scheduled, with a count.
    enabling: DashMap<String, usize>,
    loader: ManifestLoader,
}

impl PluginRegistry {
    /// Create a registry with default plugin settings.
    pub fn new(catalog: Arc<HandlerCatalog>) -> Self {
        Self::with_config(catalog, PluginsConfig::default())
    }

    /// Create a registry honoring pins, selection lists and plugin settings.
    pub fn with_config(catalog: Arc<HandlerCatalog>, config: PluginsConfig) -> Self {
        Self {
            catalog,
            config,
            arena: RwLock::new(Arena::default()),
            rejected: RwLock::new(HashMap::new()),
            locks: DashMap::new(),
            enabling: DashMap::new(),
            loader: ManifestLoader::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<HandlerCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &PluginsConfig {
        &self.config
    }

    /// Read manifests from every source directory and admit the valid ones.
    ///
    /// Errors are collected per manifest; one bad plugin never stops the
    /// discovery of its siblings.
    pub async fn discover(&self, sources: &[PathBuf]) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for source in sources {
            for candidate in self.loader.scan(source).await {
                let origin = candidate.path.display().to_string();

                let manifest = match candidate.manifest {
                    Ok(manifest) => manifest,
                    Err(e) => {
                        warn!("Rejected plugin manifest {}: {}", origin, e);
                        report.rejected.push(RejectedManifest::new(origin, None, &e));
                        continue;
                    }
                };

                let declared = manifest.declared_name().map(str::to_string);
                let admitted = manifest
                    .validate(&origin)
                    .map(|d| d.with_source(&candidate.path))
                    .and_then(|d| {
                        let name = d.name.clone();
                        self.admit(d).map(|_| name)
                    });

                match admitted {
                    Ok(name) => report.discovered.push(name),
                    Err(e) => {
                        warn!("Rejected plugin manifest {}: {}", origin, e);
                        if let Some(name) = &declared {
                            self.mark_rejected(name, &e);
                        }
                        report.rejected.push(RejectedManifest::new(origin, declared, &e));
                    }
                }
            }
        }

        report.cycles = self.isolate_cycles();
        let graph = self.graph();
        report.missing = graph.missing().to_vec();
        report.load_order = graph.topological_order();

        info!(
            "Plugin discovery: {} admitted, {} rejected, {} cycles",
            report.discovered.len(),
            report.rejected.len(),
            report.cycles.len()
        );
        report
    }

    /// Admit a plugin that is not backed by a manifest file.
    pub fn register(&self, manifest: PluginManifest) -> Result<(), PluginError> {
        let origin = match manifest.declared_name() {
            Some(name) => format!("<{}>", name),
            None => "<registered>".to_string(),
        };
        let descriptor = manifest.validate(&origin)?;
        let name = descriptor.name.clone();
        self.admit(descriptor)?;

        match self.isolate_cycles().into_iter().find(|c| c.contains(&name)) {
            Some(members) => Err(PluginError::DependencyCycle { members }),
            None => Ok(()),
        }
    }

    fn admit(&self, descriptor: PluginDescriptor) -> Result<(), PluginError> {
        let descriptor = match self.config.settings.get(&descriptor.name) {
            Some(settings) => descriptor.with_settings(settings),
            None => descriptor,
        };
        let name = descriptor.name.clone();
        let slot = Arc::new(PluginSlot::new(descriptor));

        {
            let mut arena = self.arena.write();
            match arena.index.get(&name).copied() {
                // A fresh registration after unload starts a new load cycle.
                Some(i) if arena.slots[i].state().is_terminal() => arena.slots[i] = slot,
                Some(_) => return Err(PluginError::AlreadyRegistered(name)),
                None => {
                    let i = arena.slots.len();
                    arena.slots.push(slot);
                    arena.index.insert(name.clone(), i);
                }
            }
        }

        self.rejected.write().remove(&name);
        debug!("Registered plugin: {}", name);
        Ok(())
    }

    fn mark_rejected(&self, name: &str, error: &PluginError) {
        if self.arena.read().index.contains_key(name) {
            return;
        }
        self.rejected
            .write()
            .insert(name.to_string(), error.to_string());
    }

    /// Put every member of a dependency cycle in `Error`.
    fn isolate_cycles(&self) -> Vec<Vec<String>> {
        let cycles = self.graph().cycles();
        for cycle in &cycles {
            let reason = format!("dependency cycle: {}", cycle.join(", "));
            warn!("Dependency cycle detected among: {}", cycle.join(", "));
            for member in cycle {
                if let Ok(slot) = self.slot(member) {
                    if !slot.state().is_error() {
                        slot.fail(reason.clone());
                    }
                }
            }
        }
        cycles
    }

    /// Dependency graph over every registered plugin.
    pub fn graph(&self) -> DependencyGraph {
        let arena = self.arena.read();
        DependencyGraph::build(
            arena
                .slots
                .iter()
                .map(|s| (s.descriptor.name.as_str(), &s.descriptor.dependencies)),
        )
    }

    /// Topological order followed by plugins that cannot be ordered
    /// (cycle members and their dependents), in registration order.
    pub fn load_order(&self) -> Vec<String> {
        let mut order = self.graph().topological_order();
        let arena = self.arena.read();
        for slot in &arena.slots {
            if !order.iter().any(|n| n == slot.name()) {
                order.push(slot.name().to_string());
            }
        }
        order
    }

    fn slot(&self, name: &str) -> Result<Arc<PluginSlot>, PluginError> {
        self.arena
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PluginError::NotFound(name.to_string()))
    }

    fn lifecycle_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.entry(name.to_string()).or_default().clone()
    }

    /// Map a capability to an enabled handler.
    ///
    /// A configured pin wins when the pinned plugin is enabled and declares
    /// the capability; otherwise the earliest registered enabled provider.
    pub fn resolve_capability(&self, capability: &str) -> Result<ResolvedHandler, PluginError> {
        let arena = self.arena.read();

        if let Some(pinned) = self.config.capability_pins.get(capability) {
            match arena.get(pinned).and_then(|slot| slot.resolve(capability)) {
                Some(resolved) => return Ok(resolved),
                None => warn!(
                    "Capability {} is pinned to {}, which cannot serve it; using first provider",
                    capability, pinned
                ),
            }
        }

        arena
            .slots
            .iter()
            .find_map(|slot| slot.resolve(capability))
            .ok_or_else(|| PluginError::NoHandlerAvailable(capability.to_string()))
    }

    /// Enabled plugins providing `capability`, in registration order.
    pub fn providers(&self, capability: &str) -> Vec<String> {
        self.arena
            .read()
            .slots
            .iter()
            .filter(|slot| slot.resolve(capability).is_some())
            .map(|slot| slot.name().to_string())
            .collect()
    }

    /// Every registered plugin in registration order.
    pub fn list(&self) -> Vec<PluginInfo> {
        self.arena
            .read()
            .slots
            .iter()
            .map(|slot| PluginInfo {
                descriptor: (*slot.descriptor).clone(),
                state: slot.state(),
            })
            .collect()
    }

    pub fn info(&self, name: &str) -> Option<PluginInfo> {
        self.slot(name).ok().map(|slot| PluginInfo {
            descriptor: (*slot.descriptor).clone(),
            state: slot.state(),
        })
    }

    /// Current state, including `Error` for named manifests that were rejected.
    pub fn state(&self, name: &str) -> Option<PluginState> {
        if let Ok(slot) = self.slot(name) {
            return Some(slot.state());
        }
        self.rejected
            .read()
            .get(name)
            .map(|reason| PluginState::Error(reason.clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.arena.read().index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.arena.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HandlerResolver for PluginRegistry {
    fn resolve(&self, capability: &str) -> Result<ResolvedHandler, PluginError> {
        self.resolve_capability(capability)
    }
}

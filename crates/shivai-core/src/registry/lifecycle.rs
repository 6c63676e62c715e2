//! Load, enable, disable and unload.

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::join_all;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use shivai_protocols::error::panic_message;
use shivai_protocols::{PluginError, PluginState};

use super::slot::PluginSlot;
use super::{PluginRegistry, UnloadMode};
use crate::report::{BootFailure, BootReport};

/// Marks a plugin as having an enable in flight.
///
/// Dependents waiting on the plugin keep waiting while any marker is alive;
/// dropping the last one wakes them to re-check.
struct PendingEnable<'a> {
    enabling: &'a DashMap<String, usize>,
    slot: Arc<PluginSlot>,
}

impl<'a> PendingEnable<'a> {
    fn new(enabling: &'a DashMap<String, usize>, slot: Arc<PluginSlot>) -> Self {
        *enabling.entry(slot.name().to_string()).or_insert(0) += 1;
        Self { enabling, slot }
    }
}

impl Drop for PendingEnable<'_> {
    fn drop(&mut self) {
        let name = self.slot.name();
        if let Some(mut count) = self.enabling.get_mut(name) {
            *count = count.saturating_sub(1);
        }
        self.enabling.remove_if(name, |_, count| *count == 0);
        self.slot.notify();
    }
}

impl PluginRegistry {
    fn is_enabling(&self, name: &str) -> bool {
        self.enabling.contains_key(name)
    }

    /// Create the plugin's handler through the catalog.
    pub async fn load(&self, name: &str) -> Result<(), PluginError> {
        let slot = self.slot(name)?;
        let lock = self.lifecycle_lock(name);
        let _guard = lock.lock().await;
        self.load_locked(&slot)
    }

    fn load_locked(&self, slot: &PluginSlot) -> Result<(), PluginError> {
        match slot.state() {
            PluginState::Validated => {}
            PluginState::Loaded
            | PluginState::Initialized
            | PluginState::Enabled
            | PluginState::Disabled => return Ok(()),
            other => return Err(slot.invalid("load", &other)),
        }

        let descriptor = &slot.descriptor;
        let Some(factory) = self.catalog.get(&descriptor.entry_reference) else {
            let err = PluginError::EntryNotFound {
                plugin: descriptor.name.clone(),
                entry_reference: descriptor.entry_reference.clone(),
            };
            error!("{}", err);
            slot.fail(err.to_string());
            return Err(err);
        };

        let handler = match factory.create(descriptor) {
            Ok(handler) => handler,
            Err(e) => {
                let err = PluginError::InitFailed {
                    plugin: descriptor.name.clone(),
                    reason: e.to_string(),
                };
                error!("{}", err);
                slot.fail(err.to_string());
                return Err(err);
            }
        };

        let served = handler.capabilities();
        let undeclared: Vec<&String> = descriptor.capabilities.difference(&served).collect();
        if !undeclared.is_empty() {
            warn!(
                "Plugin {} declares capabilities its handler does not report: {:?}",
                descriptor.name, undeclared
            );
        }

        slot.set_handler(handler);
        slot.transition(PluginState::Loaded, "load")?;
        info!("Loaded plugin: {} v{}", descriptor.name, descriptor.version);
        Ok(())
    }

    /// Enable a plugin, loading and initializing it first when needed.
    ///
    /// The enable counts as in flight from the moment this is called, so
    /// dependents whose futures were created alongside it wait for it no
    /// matter which future is polled first. A dependency with no enable in
    /// flight that is not enabled fails with `DependencyUnsatisfied`.
    /// Re-enabling a disabled plugin does not initialize it again.
    pub fn enable<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Future<Output = Result<(), PluginError>> + 'a {
        let pending = self
            .slot(name)
            .map(|slot| PendingEnable::new(&self.enabling, slot));
        async move {
            let pending = pending?;
            let lock = self.lifecycle_lock(name);
            let _guard = lock.lock().await;
            self.enable_locked(&pending.slot).await
        }
    }

    async fn enable_locked(&self, slot: &Arc<PluginSlot>) -> Result<(), PluginError> {
        match slot.state() {
            PluginState::Enabled => return Ok(()),
            PluginState::Validated
            | PluginState::Loaded
            | PluginState::Initialized
            | PluginState::Disabled => {}
            other => return Err(slot.invalid("enable", &other)),
        }

        self.await_dependencies(slot).await?;

        if slot.state() == PluginState::Validated {
            self.load_locked(slot)?;
        }
        if slot.state() == PluginState::Loaded {
            self.initialize_locked(slot).await?;
        }

        slot.transition(PluginState::Enabled, "enable")?;
        info!("Enabled plugin: {}", slot.name());
        Ok(())
    }

    async fn initialize_locked(&self, slot: &PluginSlot) -> Result<(), PluginError> {
        let Some(handler) = slot.handler() else {
            return Err(slot.invalid("initialize", &slot.state()));
        };

        let failure = match AssertUnwindSafe(handler.initialize()).catch_unwind().await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(panic) => Some(format!("panicked: {}", panic_message(panic.as_ref()))),
        };

        if let Some(reason) = failure {
            let err = PluginError::InitFailed {
                plugin: slot.name().to_string(),
                reason,
            };
            error!("{}", err);
            slot.fail(err.to_string());
            return Err(err);
        }

        slot.transition(PluginState::Initialized, "initialize")
    }

    async fn await_dependencies(&self, slot: &PluginSlot) -> Result<(), PluginError> {
        for dependency in slot.descriptor.dependencies.iter() {
            let unsatisfied = || PluginError::DependencyUnsatisfied {
                plugin: slot.name().to_string(),
                dependency: dependency.clone(),
            };

            let Ok(dep_slot) = self.slot(dependency) else {
                return Err(unsatisfied());
            };
            let mut state = dep_slot.state.subscribe();

            loop {
                {
                    let current = state.borrow_and_update();
                    if current.is_enabled() {
                        break;
                    }
                    if !self.is_enabling(dependency) {
                        warn!(
                            "Plugin {} blocked: dependency {} is {}",
                            slot.name(),
                            dependency,
                            *current
                        );
                        return Err(unsatisfied());
                    }
                }
                debug!("Plugin {} waiting for dependency {}", slot.name(), dependency);
                if state.changed().await.is_err() {
                    return Err(unsatisfied());
                }
            }
        }
        Ok(())
    }

    /// Remove a plugin from capability resolution. Running work finishes;
    /// the handler stays loaded.
    pub async fn disable(&self, name: &str) -> Result<(), PluginError> {
        let slot = self.slot(name)?;
        let lock = self.lifecycle_lock(name);
        let _guard = lock.lock().await;

        match slot.state() {
            PluginState::Disabled => Ok(()),
            PluginState::Enabled => {
                slot.transition(PluginState::Disabled, "disable")?;
                info!("Disabled plugin: {}", name);
                Ok(())
            }
            other => Err(slot.invalid("disable", &other)),
        }
    }

    /// Shut a plugin's handler down and drop it.
    pub async fn unload(&self, name: &str, mode: UnloadMode) -> Result<(), PluginError> {
        let slot = self.slot(name)?;

        let dependents: Vec<String> = self
            .graph()
            .dependents_of(name)
            .into_iter()
            .filter(|d| self.state(d).is_some_and(|s| s.is_enabled()))
            .collect();

        if !dependents.is_empty() {
            match mode {
                UnloadMode::Strict => {
                    return Err(PluginError::InUse {
                        plugin: name.to_string(),
                        dependents,
                    });
                }
                UnloadMode::Cascade => {
                    for dependent in &dependents {
                        info!("Disabling {} before unloading {}", dependent, name);
                        self.disable(dependent).await?;
                    }
                }
            }
        }

        let lock = self.lifecycle_lock(name);
        let _guard = lock.lock().await;
        self.unload_locked(&slot).await
    }

    async fn unload_locked(&self, slot: &PluginSlot) -> Result<(), PluginError> {
        let state = slot.state();
        if state.is_terminal() {
            return Ok(());
        }
        if state.is_enabled() {
            slot.transition(PluginState::Disabled, "unload")?;
        }

        let initialized = matches!(
            state,
            PluginState::Initialized | PluginState::Enabled | PluginState::Disabled
        );
        if let Some(handler) = slot.take_handler() {
            if initialized {
                match AssertUnwindSafe(handler.shutdown()).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("Plugin {} shutdown failed: {}", slot.name(), e),
                    Err(panic) => warn!(
                        "Plugin {} shutdown panicked: {}",
                        slot.name(),
                        panic_message(panic.as_ref())
                    ),
                }
            }
        }

        slot.transition(PluginState::Unloaded, "unload")?;
        info!("Unloaded plugin: {}", slot.name());
        Ok(())
    }

    /// Load and enable every plugin selected by configuration.
    ///
    /// Plugins are started in load order; independent plugins enable
    /// concurrently while each one waits on its dependencies.
    pub async fn boot(&self) -> BootReport {
        let mut report = BootReport::default();
        let mut selected = Vec::new();

        for name in self.load_order() {
            let Ok(slot) = self.slot(&name) else { continue };
            match slot.state() {
                PluginState::Validated | PluginState::Loaded | PluginState::Initialized => {}
                _ => continue,
            }
            if self
                .config
                .wants_enabled(&name, slot.descriptor.enabled_by_default)
            {
                selected.push(slot);
            } else {
                debug!("Plugin {} not selected for boot", name);
                report.skipped.push(name);
            }
        }

        // Every enable is in flight before any of them runs; each one stops
        // counting as in flight as soon as it finishes.
        let enables: Vec<_> = selected
            .iter()
            .map(|slot| {
                let enable = self.enable(slot.name());
                async move { (slot.name().to_string(), enable.await) }
            })
            .collect();
        let results = join_all(enables).await;

        for (plugin, result) in results {
            match result {
                Ok(()) => report.enabled.push(plugin),
                Err(e) => report.failed.push(BootFailure {
                    plugin,
                    kind: e.kind(),
                    reason: e.to_string(),
                }),
            }
        }

        info!(
            "Plugin boot: {} enabled, {} failed, {} skipped",
            report.enabled.len(),
            report.failed.len(),
            report.skipped.len()
        );
        report
    }

    /// Unload every plugin, dependents before their dependencies.
    pub async fn shutdown(&self) {
        let mut order = self.load_order();
        order.reverse();

        for name in order {
            let Ok(slot) = self.slot(&name) else { continue };
            let lock = self.lifecycle_lock(&name);
            let _guard = lock.lock().await;
            if let Err(e) = self.unload_locked(&slot).await {
                warn!("Failed to unload {}: {}", name, e);
            }
        }
        info!("Plugin registry shut down");
    }
}

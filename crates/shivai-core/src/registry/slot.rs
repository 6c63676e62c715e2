//! One registered plugin: descriptor, lifecycle state and handler.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use shivai_protocols::{CommandHandler, PluginDescriptor, PluginError, PluginState, ResolvedHandler};

pub(crate) struct PluginSlot {
    pub(crate) descriptor: Arc<PluginDescriptor>,
    /// Current state; receivers are woken on every change.
    pub(crate) state: watch::Sender<PluginState>,
    handler: Mutex<Option<Arc<dyn CommandHandler>>>,
}

impl PluginSlot {
    pub(crate) fn new(descriptor: PluginDescriptor) -> Self {
        let (state, _) = watch::channel(PluginState::Validated);
        Self {
            descriptor: Arc::new(descriptor),
            state,
            handler: Mutex::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub(crate) fn state(&self) -> PluginState {
        self.state.borrow().clone()
    }

    /// Move to `next` if the lifecycle allows it.
    pub(crate) fn transition(
        &self,
        next: PluginState,
        operation: &'static str,
    ) -> Result<(), PluginError> {
        let mut result = Ok(());
        self.state.send_if_modified(|current| {
            if current.can_transition_to(&next) {
                debug!("Plugin {}: {} -> {}", self.descriptor.name, current, next);
                *current = next;
                true
            } else {
                result = Err(PluginError::InvalidState {
                    plugin: self.descriptor.name.clone(),
                    operation,
                    state: current.to_string(),
                });
                false
            }
        });
        result
    }

    /// Put the plugin in `Error`. Has no effect once unloaded.
    pub(crate) fn fail(&self, reason: impl Into<String>) {
        let _ = self.transition(PluginState::Error(reason.into()), "fail");
    }

    /// Wake state watchers without changing the state.
    pub(crate) fn notify(&self) {
        self.state.send_modify(|_| {});
    }

    pub(crate) fn invalid(&self, operation: &'static str, state: &PluginState) -> PluginError {
        PluginError::InvalidState {
            plugin: self.descriptor.name.clone(),
            operation,
            state: state.to_string(),
        }
    }

    pub(crate) fn handler(&self) -> Option<Arc<dyn CommandHandler>> {
        self.handler.lock().clone()
    }

    pub(crate) fn set_handler(&self, handler: Arc<dyn CommandHandler>) {
        *self.handler.lock() = Some(handler);
    }

    pub(crate) fn take_handler(&self) -> Option<Arc<dyn CommandHandler>> {
        self.handler.lock().take()
    }

    /// The handler for `capability` if this plugin may serve it now.
    pub(crate) fn resolve(&self, capability: &str) -> Option<ResolvedHandler> {
        if !self.state.borrow().is_enabled() || !self.descriptor.provides(capability) {
            return None;
        }
        self.handler().map(|handler| ResolvedHandler {
            plugin: self.descriptor.name.clone(),
            handler,
            config: self.descriptor.config.clone(),
        })
    }
}

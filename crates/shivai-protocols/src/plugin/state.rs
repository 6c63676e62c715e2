//! Plugin lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one plugin.
///
/// `Discovered -> Validated -> Loaded -> Initialized -> Enabled <-> Disabled -> Unloaded`,
/// with `Error` reachable from every non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum PluginState {
    Discovered,
    Validated,
    Loaded,
    Initialized,
    Enabled,
    Disabled,
    Unloaded,
    Error(String),
}

impl PluginState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, PluginState::Enabled)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PluginState::Error(_))
    }

    /// `Unloaded` ends a plugin's life in this process.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PluginState::Unloaded)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: &PluginState) -> bool {
        use PluginState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Error(_)) => true,
            (Discovered, Validated)
            | (Validated, Loaded)
            | (Loaded, Initialized)
            | (Initialized, Enabled)
            | (Enabled, Disabled)
            | (Disabled, Enabled) => true,
            (Enabled, Unloaded) => false,
            (_, Unloaded) => true,
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PluginState::Discovered => "discovered",
            PluginState::Validated => "validated",
            PluginState::Loaded => "loaded",
            PluginState::Initialized => "initialized",
            PluginState::Enabled => "enabled",
            PluginState::Disabled => "disabled",
            PluginState::Unloaded => "unloaded",
            PluginState::Error(_) => "error",
        }
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginState::Error(reason) => write!(f, "error ({})", reason),
            other => f.write_str(other.label()),
        }
    }
}

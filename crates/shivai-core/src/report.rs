//! Reports returned by discovery and boot.

use serde::Serialize;

use shivai_protocols::{FailureKind, PluginDescriptor, PluginError, PluginState};

use crate::graph::MissingDependency;

/// A manifest that did not make it into the registry.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedManifest {
    /// Manifest path, or the plugin name for programmatic registrations.
    pub origin: String,
    /// Declared name, when the manifest had one.
    pub name: Option<String>,
    pub kind: FailureKind,
    pub reason: String,
}

impl RejectedManifest {
    pub(crate) fn new(origin: impl Into<String>, name: Option<String>, error: &PluginError) -> Self {
        Self {
            origin: origin.into(),
            name,
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    /// Plugins admitted by this pass, in admission order.
    pub discovered: Vec<String>,
    pub rejected: Vec<RejectedManifest>,
    /// Dependency cycles; every member is in `Error`.
    pub cycles: Vec<Vec<String>>,
    /// Dependencies naming no registered plugin.
    pub missing: Vec<MissingDependency>,
    /// Order in which the registry will load plugins.
    pub load_order: Vec<String>,
}

impl DiscoveryReport {
    pub fn has_errors(&self) -> bool {
        !self.rejected.is_empty() || !self.cycles.is_empty() || !self.missing.is_empty()
    }
}

/// A plugin that could not be enabled during boot.
#[derive(Debug, Clone, Serialize)]
pub struct BootFailure {
    pub plugin: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Outcome of [`PluginRegistry::boot`](crate::PluginRegistry::boot).
#[derive(Debug, Clone, Default, Serialize)]
pub struct BootReport {
    /// Plugins enabled, in load order.
    pub enabled: Vec<String>,
    pub failed: Vec<BootFailure>,
    /// Plugins left alone by configuration.
    pub skipped: Vec<String>,
}

/// Descriptor and current state of one plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub descriptor: PluginDescriptor,
    pub state: PluginState,
}

impl PluginInfo {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

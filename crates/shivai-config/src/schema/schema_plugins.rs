//! Plugin discovery and selection settings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::default_true;

/// Plugin configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Directories scanned for plugin manifests.
    #[serde(default = "default_plugin_dirs")]
    pub dirs: Vec<PathBuf>,

    /// Load and enable plugins at startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,

    /// Plugins enabled even if their manifest says otherwise.
    #[serde(default)]
    pub enabled: Vec<String>,

    /// Plugins never enabled at startup.
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Capability to plugin name; overrides first-registered-wins.
    #[serde(default)]
    pub capability_pins: HashMap<String, String>,

    /// Per-plugin settings merged over the manifest's `config`.
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl PluginsConfig {
    /// Whether a plugin should be enabled at boot.
    pub fn wants_enabled(&self, name: &str, enabled_by_default: bool) -> bool {
        if self.disabled.iter().any(|n| n == name) {
            return false;
        }
        enabled_by_default || self.enabled.iter().any(|n| n == name)
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dirs: default_plugin_dirs(),
            auto_load: true,
            enabled: Vec::new(),
            disabled: Vec::new(),
            capability_pins: HashMap::new(),
            settings: HashMap::new(),
        }
    }
}

fn default_plugin_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("~/.shivai/plugins"), PathBuf::from("plugins")]
}

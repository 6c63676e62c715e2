//! Validated plugin metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::types::Version;

/// A manifest that passed validation. Owned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub capabilities: BTreeSet<String>,
    pub dependencies: BTreeSet<String>,
    pub entry_reference: String,
    pub enabled_by_default: bool,
    /// Plugin configuration: manifest defaults overlaid with user settings.
    #[serde(default)]
    pub config: serde_json::Value,
    /// Manifest file this descriptor came from, `None` for built-ins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl PluginDescriptor {
    pub fn provides(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.contains(name)
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Overlay user settings on top of the manifest's config.
    ///
    /// Objects merge key by key; any other settings value replaces the
    /// manifest config outright.
    pub fn with_settings(mut self, settings: &serde_json::Value) -> Self {
        match (&mut self.config, settings) {
            (_, serde_json::Value::Null) => {}
            (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
                for (key, value) in overlay {
                    base.insert(key.clone(), value.clone());
                }
            }
            (config, other) => *config = other.clone(),
        }
        self
    }
}

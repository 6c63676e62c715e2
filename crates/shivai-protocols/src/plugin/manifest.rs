//! Raw plugin manifests as read from disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::PluginDescriptor;
use crate::error::PluginError;
use crate::types::Version;

/// Manifest exactly as written by a plugin author.
///
/// Every field is optional at this stage so that a malformed manifest can
/// still be named in the discovery report. [`PluginManifest::validate`]
/// turns it into a [`PluginDescriptor`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, alias = "plugin_class", skip_serializing_if = "Option::is_none")]
    pub entry_reference: Option<String>,
    #[serde(default = "default_enabled", alias = "enabled")]
    pub enabled_by_default: bool,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}

impl PluginManifest {
    /// Create a manifest for a programmatically registered plugin.
    pub fn new(name: impl Into<String>, entry_reference: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            entry_reference: Some(entry_reference.into()),
            enabled_by_default: true,
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    pub fn disabled_by_default(mut self) -> Self {
        self.enabled_by_default = false;
        self
    }

    pub fn from_json(text: &str, origin: &str) -> Result<Self, PluginError> {
        serde_json::from_str(text).map_err(|e| PluginError::manifest_invalid(origin, e.to_string()))
    }

    pub fn from_toml(text: &str, origin: &str) -> Result<Self, PluginError> {
        toml::from_str(text).map_err(|e| PluginError::manifest_invalid(origin, e.to_string()))
    }

    /// Name if present and non-blank, used to attribute rejections.
    pub fn declared_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// Check required fields and build a descriptor.
    ///
    /// `origin` names the manifest in error messages (usually its path).
    pub fn validate(self, origin: &str) -> Result<PluginDescriptor, PluginError> {
        let invalid = |reason: String| PluginError::manifest_invalid(origin, reason);

        let name = self
            .declared_name()
            .ok_or_else(|| invalid("missing required field 'name'".to_string()))?
            .to_string();
        if !is_valid_name(&name) {
            return Err(invalid(format!(
                "plugin name '{}' may only contain letters, digits, '-', '_' and '.'",
                name
            )));
        }

        let entry_reference = self
            .entry_reference
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| invalid(format!("plugin '{}' is missing 'entry_reference'", name)))?
            .to_string();

        let version = match self.version.as_deref() {
            None => Version::default(),
            Some(raw) => raw
                .parse::<Version>()
                .map_err(|e| invalid(format!("plugin '{}': {}", name, e)))?,
        };

        let mut capabilities = BTreeSet::new();
        for capability in &self.capabilities {
            let capability = capability.trim();
            if capability.is_empty() {
                return Err(invalid(format!("plugin '{}' declares an empty capability", name)));
            }
            capabilities.insert(capability.to_string());
        }

        let mut dependencies = BTreeSet::new();
        for dependency in &self.dependencies {
            let dependency = dependency.trim();
            if dependency.is_empty() {
                return Err(invalid(format!("plugin '{}' declares an empty dependency", name)));
            }
            if dependency == name {
                return Err(invalid(format!("plugin '{}' depends on itself", name)));
            }
            dependencies.insert(dependency.to_string());
        }

        Ok(PluginDescriptor {
            name,
            version,
            description: self.description,
            author: self.author,
            capabilities,
            dependencies,
            entry_reference,
            enabled_by_default: self.enabled_by_default,
            config: self.config,
            source: None,
        })
    }
}

fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;

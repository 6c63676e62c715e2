//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

mod schema_plugins;
mod schema_runtime;

pub use schema_plugins::*;
pub use schema_runtime::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub parser: ParserConfig,

    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Intent category name to capability overrides.
    #[serde(default)]
    pub routing: BTreeMap<String, String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Directory for persisted context and logs.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Capability that receives `unknown` intents.
    #[serde(default = "default_fallback_capability")]
    pub fallback_capability: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            data_dir: default_data_dir(),
            fallback_capability: default_fallback_capability(),
        }
    }
}

fn default_agent_name() -> String {
    "shivai".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.shivai")
}

fn default_fallback_capability() -> String {
    "system".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory; `<data_dir>/logs` when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub file: bool,

    #[serde(default)]
    pub json: bool,

    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
            file: true,
            json: false,
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    30
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

//! Plugin discovery and lifecycle errors.

use thiserror::Error;

use crate::outcome::FailureKind;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Invalid manifest {origin}: {reason}")]
    ManifestInvalid { origin: String, reason: String },

    #[error("Dependency cycle detected among: {}", .members.join(", "))]
    DependencyCycle { members: Vec<String> },

    #[error("Plugin dependency not satisfied: {plugin} requires {dependency}")]
    DependencyUnsatisfied { plugin: String, dependency: String },

    #[error("Plugin {plugin} failed to initialize: {reason}")]
    InitFailed { plugin: String, reason: String },

    #[error("Plugin {plugin} is in use by: {}", .dependents.join(", "))]
    InUse {
        plugin: String,
        dependents: Vec<String>,
    },

    #[error("No enabled plugin provides capability: {0}")]
    NoHandlerAvailable(String),

    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Plugin already registered: {0}")]
    AlreadyRegistered(String),

    #[error("No handler factory for entry reference {entry_reference} (plugin {plugin})")]
    EntryNotFound {
        plugin: String,
        entry_reference: String,
    },

    #[error("Plugin {plugin} cannot {operation} while {state}")]
    InvalidState {
        plugin: String,
        operation: &'static str,
        state: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    pub fn manifest_invalid(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        PluginError::ManifestInvalid {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    /// Failure classification reported to callers.
    pub fn kind(&self) -> FailureKind {
        match self {
            PluginError::ManifestInvalid { .. }
            | PluginError::AlreadyRegistered(_)
            | PluginError::EntryNotFound { .. }
            | PluginError::Io(_) => FailureKind::ManifestInvalid,
            PluginError::DependencyCycle { .. } => FailureKind::DependencyCycle,
            PluginError::DependencyUnsatisfied { .. } => FailureKind::DependencyUnsatisfied,
            PluginError::InitFailed { .. } | PluginError::InvalidState { .. } => {
                FailureKind::PluginInitFailed
            }
            PluginError::InUse { .. } => FailureKind::PluginInUse,
            PluginError::NoHandlerAvailable(_) | PluginError::NotFound(_) => {
                FailureKind::NoHandlerAvailable
            }
        }
    }
}

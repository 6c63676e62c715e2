//! Agent errors.

use thiserror::Error;

use shivai_config::ConfigError;
use shivai_context::ContextError;
use shivai_protocols::{PluginError, TaskError};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;

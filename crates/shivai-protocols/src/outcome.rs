//! Terminal results of work items.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of every failure the agent can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ParseAmbiguous,
    ManifestInvalid,
    DependencyCycle,
    DependencyUnsatisfied,
    PluginInitFailed,
    PluginInUse,
    NoHandlerAvailable,
    HandlerFailed,
    TaskTimeout,
    TaskRetryExhausted,
    CancellationRequested,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::ParseAmbiguous => "parse_ambiguous",
            FailureKind::ManifestInvalid => "manifest_invalid",
            FailureKind::DependencyCycle => "dependency_cycle",
            FailureKind::DependencyUnsatisfied => "dependency_unsatisfied",
            FailureKind::PluginInitFailed => "plugin_init_failed",
            FailureKind::PluginInUse => "plugin_in_use",
            FailureKind::NoHandlerAvailable => "no_handler_available",
            FailureKind::HandlerFailed => "handler_failed",
            FailureKind::TaskTimeout => "task_timeout",
            FailureKind::TaskRetryExhausted => "task_retry_exhausted",
            FailureKind::CancellationRequested => "cancellation_requested",
        };
        f.write_str(s)
    }
}

/// Details of a failed work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Attempts that were started before the item went terminal.
    pub attempts: u32,
    /// Kind of the last attempt's error, set when retries were exhausted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<FailureKind>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>, attempts: u32) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: FailureKind) -> Self {
        self.cause = Some(cause);
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Terminal status without payload, as kept in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
    Cancelled,
}

/// Final result of a work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded { payload: serde_json::Value },
    Failed { failure: Failure },
    Cancelled { attempts: u32 },
}

impl Outcome {
    pub fn succeeded(payload: serde_json::Value) -> Self {
        Outcome::Succeeded { payload }
    }

    pub fn failed(failure: Failure) -> Self {
        Outcome::Failed { failure }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Outcome::Succeeded { .. } => OutcomeStatus::Succeeded,
            Outcome::Failed { .. } => OutcomeStatus::Failed,
            Outcome::Cancelled { .. } => OutcomeStatus::Cancelled,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Outcome::Succeeded { payload } => Some(payload),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Failed { failure } => Some(failure),
            _ => None,
        }
    }

    /// Kind recorded in history for non-successful outcomes.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Succeeded { .. } => None,
            Outcome::Failed { failure } => Some(failure.kind),
            Outcome::Cancelled { .. } => Some(FailureKind::CancellationRequested),
        }
    }
}

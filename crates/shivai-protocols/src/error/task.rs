//! Work item execution errors.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::HandlerError;
use crate::outcome::{Failure, FailureKind};

#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("No handler available for capability: {0}")]
    NoHandlerAvailable(String),

    #[error("Task timed out after {0:?}")]
    Timeout(Duration),

    #[error("Task cancelled")]
    Cancelled,

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Handler panicked: {0}")]
    HandlerPanicked(String),

    #[error("Unknown work item: {0}")]
    UnknownHandle(Uuid),

    #[error("Timed out waiting for result after {0:?}")]
    AwaitTimeout(Duration),

    #[error("Queue is full")]
    QueueFull,

    #[error("Scheduler is not running")]
    NotRunning,
}

impl TaskError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskError::NoHandlerAvailable(_) => FailureKind::NoHandlerAvailable,
            TaskError::Timeout(_) | TaskError::AwaitTimeout(_) => FailureKind::TaskTimeout,
            TaskError::Cancelled | TaskError::Handler(HandlerError::Cancelled) => {
                FailureKind::CancellationRequested
            }
            TaskError::Handler(_)
            | TaskError::HandlerPanicked(_)
            | TaskError::UnknownHandle(_)
            | TaskError::QueueFull
            | TaskError::NotRunning => FailureKind::HandlerFailed,
        }
    }

    /// Failure record for an item that ended on this error.
    pub fn to_failure(&self, attempts: u32) -> Failure {
        Failure::new(self.kind(), self.to_string(), attempts)
    }

    /// Whether another attempt may be scheduled after this error.
    ///
    /// A missing handler will not appear without intervention, and
    /// cancellation is terminal.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            TaskError::NoHandlerAvailable(_)
                | TaskError::Cancelled
                | TaskError::Handler(HandlerError::Cancelled)
        )
    }
}

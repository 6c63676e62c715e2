//! # ShivAI Work Queue
//!
//! Priority scheduling of parsed commands.
//!
//! ## Components
//!
//! - [`Scheduler`] - Bounded worker pool with retries, timeouts and cancellation
//! - [`WorkItem`] - A unit of work and its state trail
//! - [`ReadyQueue`] - Stable priority queue keyed by eligibility
//! - [`BackoffPolicy`] - Exponential retry delays
//! - [`Clock`] - Time source for retry eligibility

pub mod backoff;
pub mod clock;
pub mod item;
pub mod queue;
pub mod scheduler;

pub use backoff::BackoffPolicy;
pub use clock::{Clock, ManualClock, SystemClock};
pub use item::{Priority, WorkHandle, WorkItem, WorkState};
pub use queue::ReadyQueue;
pub use scheduler::{CompletionCallback, Scheduler, SchedulerStats};
pub use shivai_protocols::TaskError;

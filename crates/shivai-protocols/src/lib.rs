//! # ShivAI Protocols
//!
//! Shared definitions for the ShivAI command agent. Contains types and
//! traits only; the parser, registry, scheduler and context store live in
//! their own crates.
//!
//! ## Core Types
//!
//! - [`Intent`] - Classified meaning of an utterance
//! - [`Outcome`] - Terminal result of a work item
//! - [`PluginManifest`] / [`PluginDescriptor`] - Plugin metadata
//! - [`ContextSnapshot`] - Read-only view of the context store
//!
//! ## Core Traits
//!
//! - [`CommandHandler`] - Capability implementation provided by a plugin
//! - [`HandlerFactory`] - Builds a handler from a plugin descriptor
//! - [`HandlerResolver`] - Maps a capability to an enabled handler

pub mod context;
pub mod error;
pub mod intent;
pub mod outcome;
pub mod plugin;
pub mod types;

pub use context::{ContextEntry, ContextSnapshot, HistoryRecord, HistoryStats};
pub use error::{HandlerError, PluginError, TaskError};
pub use intent::{CategoryClass, EntityValue, Intent, IntentCategory, Language};
pub use outcome::{Failure, FailureKind, Outcome, OutcomeStatus};
pub use plugin::{
    CommandHandler, HandlerContext, HandlerFactory, HandlerResolver, PluginDescriptor,
    PluginManifest, PluginState, ResolvedHandler,
};
pub use types::*;

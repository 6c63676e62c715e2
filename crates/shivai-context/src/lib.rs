//! # ShivAI Context
//!
//! Process-wide key/value memory plus a bounded history of finished work
//! items. Writers are serialized; readers get consistent snapshots.

mod error;
mod persistence;
mod store;

pub use error::{ContextError, ContextResult};
pub use persistence::{ContextPersistence, JsonFileContextPersistence, PersistedContext};
pub use store::ContextStore;

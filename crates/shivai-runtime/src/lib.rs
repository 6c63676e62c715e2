//! # ShivAI Runtime
//!
//! The agent orchestrator: turns utterances into routed work items and
//! delivers their outcomes.
//!
//! ## Components
//!
//! - [`Agent`] / [`AgentBuilder`] - Wiring and entry points
//! - [`RoutingTable`] - Category to capability and priority
//! - [`SystemHandler`] - Built-in help, status and exit plugin
//! - [`UtteranceSource`] / [`UtteranceSink`] - Session endpoints

pub mod agent;
pub mod error;
pub mod routing;
pub mod session;
pub mod system;

pub use agent::{Agent, AgentBuilder};
pub use error::{AgentError, AgentResult};
pub use routing::RoutingTable;
pub use session::{MemorySink, Reply, ScriptedSource, UtteranceSink, UtteranceSource};
pub use system::{SYSTEM_CAPABILITY, SYSTEM_ENTRY, SYSTEM_PLUGIN, SystemHandler, system_manifest};

//! # ShivAI Core
//!
//! Plugin management for the ShivAI agent.
//!
//! ## Components
//!
//! - [`PluginRegistry`] - Discovery, lifecycle and capability resolution
//! - [`DependencyGraph`] - Load order and cycle detection
//! - [`HandlerCatalog`] - Handler factories keyed by entry reference
//! - [`ManifestLoader`] - Reads plugin manifests from disk

pub mod catalog;
pub mod discovery;
pub mod graph;
pub mod registry;
pub mod report;

pub use catalog::HandlerCatalog;
pub use discovery::{ManifestCandidate, ManifestLoader, MANIFEST_FILES};
pub use graph::{DependencyGraph, MissingDependency};
pub use registry::{PluginRegistry, UnloadMode};
pub use report::{BootFailure, BootReport, DiscoveryReport, PluginInfo, RejectedManifest};

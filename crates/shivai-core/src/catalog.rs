//! Handler factories keyed by entry reference.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;

use shivai_protocols::HandlerFactory;

/// Maps a manifest's `entry_reference` to the factory that builds its handler.
pub struct HandlerCatalog {
    factories: DashMap<String, Arc<dyn HandlerFactory>>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
        }
    }

    /// Register a factory. A later registration for the same entry replaces
    /// the earlier one.
    pub fn register(&self, entry_reference: impl Into<String>, factory: impl HandlerFactory) {
        let entry_reference = entry_reference.into();
        if self
            .factories
            .insert(entry_reference.clone(), Arc::new(factory))
            .is_some()
        {
            warn!("Replaced handler factory for entry: {}", entry_reference);
        }
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(self, entry_reference: impl Into<String>, factory: impl HandlerFactory) -> Self {
        self.register(entry_reference, factory);
        self
    }

    pub fn get(&self, entry_reference: &str) -> Option<Arc<dyn HandlerFactory>> {
        self.factories.get(entry_reference).map(|f| f.clone())
    }

    pub fn contains(&self, entry_reference: &str) -> bool {
        self.factories.contains_key(entry_reference)
    }

    /// Registered entry references, sorted.
    pub fn entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        entries.sort();
        entries
    }
}

impl Default for HandlerCatalog {
    fn default() -> Self {
        Self::new()
    }
}

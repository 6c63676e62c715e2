//! Intent category to capability routing.

use std::collections::BTreeMap;
use tracing::warn;

use shivai_config::Config;
use shivai_protocols::{CategoryClass, IntentCategory};
use shivai_workqueue::Priority;

/// Decides where and how urgently each intent category runs.
///
/// Configured overrides win; `unknown` goes to the fallback capability;
/// everything else uses the category's default capability.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    overrides: BTreeMap<IntentCategory, String>,
    fallback: String,
}

impl RoutingTable {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            overrides: BTreeMap::new(),
            fallback: fallback.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut table = Self::new(config.agent.fallback_capability.clone());
        for (category, capability) in &config.routing {
            match category.parse::<IntentCategory>() {
                Ok(category) => table.set(category, capability.clone()),
                Err(e) => warn!("Ignoring route: {}", e),
            }
        }
        table
    }

    pub fn set(&mut self, category: IntentCategory, capability: impl Into<String>) {
        self.overrides.insert(category, capability.into());
    }

    pub fn capability_for(&self, category: IntentCategory) -> &str {
        if let Some(capability) = self.overrides.get(&category) {
            return capability;
        }
        if category.is_unknown() {
            return &self.fallback;
        }
        category.default_capability()
    }

    pub fn priority_for(&self, category: IntentCategory) -> Priority {
        match category.class() {
            CategoryClass::System => Priority::High,
            CategoryClass::Application | CategoryClass::Device => Priority::Normal,
            CategoryClass::Generic | CategoryClass::Unknown => Priority::Low,
        }
    }
}

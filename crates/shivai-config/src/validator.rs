//! Configuration validation.

use shivai_protocols::IntentCategory;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Collapse errors into a single [`ConfigError`]: one bad field reports
    /// as [`ConfigError::InvalidValue`], several as [`ConfigError::Invalid`].
    pub fn into_result(mut self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.len() {
            0 => Ok(self.warnings),
            1 => {
                let error = self.errors.remove(0);
                Err(ConfigError::InvalidValue {
                    field: error.path,
                    message: error.message,
                })
            }
            _ => Err(ConfigError::Invalid(
                self.errors
                    .into_iter()
                    .map(|e| format!("{}: {}", e.path, e.message))
                    .collect(),
            )),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_agent(config, &mut result);
        Self::validate_scheduler(config, &mut result);
        Self::validate_context(config, &mut result);
        Self::validate_parser(config, &mut result);
        Self::validate_plugins(config, &mut result);
        Self::validate_routing(config, &mut result);

        Ok(result)
    }

    fn validate_agent(config: &Config, result: &mut ValidationResult) {
        if config.agent.fallback_capability.trim().is_empty() {
            result.add_error(ValidationError::new(
                "agent.fallback_capability",
                "fallback_capability cannot be empty",
            ));
        }
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        let scheduler = &config.scheduler;

        if scheduler.max_concurrent_workers == 0 {
            result.add_error(ValidationError::new(
                "scheduler.max_concurrent_workers",
                "max_concurrent_workers must be at least 1",
            ));
        }

        if scheduler.max_concurrent_workers > 64 {
            result.add_warning(ValidationWarning::new(
                "scheduler.max_concurrent_workers",
                "more than 64 workers is unusual for a local agent",
            ));
        }

        if scheduler.default_max_attempts == 0 {
            result.add_error(ValidationError::new(
                "scheduler.default_max_attempts",
                "default_max_attempts must be at least 1",
            ));
        }

        if scheduler.default_task_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "scheduler.default_task_timeout_ms",
                "default_task_timeout_ms must be greater than 0",
            ));
        }

        if scheduler.retry_backoff_base_ms > scheduler.retry_backoff_cap_ms {
            result.add_error(ValidationError::new(
                "scheduler.retry_backoff_base_ms",
                "retry_backoff_base_ms cannot exceed retry_backoff_cap_ms",
            ));
        }

        if scheduler.completed_retention == 0 {
            result.add_warning(ValidationWarning::new(
                "scheduler.completed_retention",
                "completed items will not be queryable after they finish",
            ));
        }
    }

    fn validate_context(config: &Config, result: &mut ValidationResult) {
        let context = &config.context;

        if context.history_retention_count == 0 {
            result.add_error(ValidationError::new(
                "context.history_retention_count",
                "history_retention_count must be at least 1",
            ));
        }

        if context.recent_window > context.history_retention_count {
            result.add_warning(ValidationWarning::new(
                "context.recent_window",
                "recent_window is larger than history_retention_count",
            ));
        }
    }

    fn validate_parser(config: &Config, result: &mut ValidationResult) {
        let parser = &config.parser;
        let fields = [
            ("parser.confidence_threshold", parser.confidence_threshold),
            ("parser.mixed_language_min_share", parser.mixed_language_min_share),
            ("parser.hint_confidence_ceiling", parser.hint_confidence_ceiling),
        ];

        for (path, value) in fields {
            if !(0.0..=1.0).contains(&value) {
                result.add_error(ValidationError::new(path, "value must be within [0, 1]"));
            }
        }
    }

    fn validate_plugins(config: &Config, result: &mut ValidationResult) {
        let plugins = &config.plugins;

        for name in &plugins.enabled {
            if plugins.disabled.contains(name) {
                result.add_error(ValidationError::new(
                    "plugins",
                    format!("Plugin '{}' is both enabled and disabled", name),
                ));
            }
        }

        for (capability, plugin) in &plugins.capability_pins {
            if plugin.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("plugins.capability_pins.{}", capability),
                    "pinned plugin name cannot be empty",
                ));
            }
        }

        if plugins.auto_load && plugins.dirs.is_empty() {
            result.add_warning(ValidationWarning::new(
                "plugins.dirs",
                "auto_load is on but no plugin directories are configured",
            ));
        }
    }

    fn validate_routing(config: &Config, result: &mut ValidationResult) {
        for (category, capability) in &config.routing {
            if category.parse::<IntentCategory>().is_err() {
                result.add_error(ValidationError::new(
                    format!("routing.{}", category),
                    format!("'{}' is not an intent category", category),
                ));
            }
            if capability.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("routing.{}", category),
                    "capability cannot be empty",
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}]+)\}")?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.shivai`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }

    /// Expand a configured path, leaving non-UTF-8 paths untouched.
    pub fn expand_pathbuf(path: &Path) -> PathBuf {
        match path.to_str() {
            Some(s) => PathBuf::from(Self::expand_path(s)),
            None => path.to_path_buf(),
        }
    }

    /// Default location of the user config file.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("shivai").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config/default.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.scheduler.max_concurrent_workers, 3);
        assert_eq!(config.context.history_retention_count, 500);
    }

    #[test]
    fn test_load_scheduler_section() {
        let content = r#"
            [scheduler]
            max_concurrent_workers = 8
            default_task_timeout_ms = 2000
            default_max_attempts = 5
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.scheduler.max_concurrent_workers, 8);
        assert_eq!(config.scheduler.default_task_timeout_ms, 2000);
        assert_eq!(config.scheduler.default_max_attempts, 5);
        assert_eq!(config.scheduler.retry_backoff_base_ms, 1000);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[parser]").unwrap();
        writeln!(file, "confidence_threshold = 0.6").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert!((config.parser.confidence_threshold - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ConfigLoader::load_or_default(Path::new("/nonexistent/shivai.toml")).unwrap();
        assert_eq!(config.agent.name, "shivai");
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("SHIVAI_TEST_CONFIG_VAR", "test_value");
        }
        let content = "value = \"${SHIVAI_TEST_CONFIG_VAR}\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert!(expanded.contains("test_value"));
        unsafe {
            std::env::remove_var("SHIVAI_TEST_CONFIG_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_SHIVAI_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/test");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/test"));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        assert_eq!(ConfigLoader::expand_path("/usr/local/bin"), "/usr/local/bin");
    }

    #[test]
    fn test_load_plugins_section() {
        let content = r#"
            [plugins]
            dirs = ["/opt/shivai/plugins"]
            disabled = ["camera"]

            [plugins.capability_pins]
            device_control = "adb-bridge"

            [plugins.settings.adb-bridge]
            serial = "emulator-5554"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.plugins.dirs, vec![PathBuf::from("/opt/shivai/plugins")]);
        assert_eq!(config.plugins.disabled, vec!["camera".to_string()]);
        assert_eq!(
            config.plugins.capability_pins.get("device_control").map(String::as_str),
            Some("adb-bridge")
        );
        assert_eq!(config.plugins.settings["adb-bridge"]["serial"], "emulator-5554");
    }

    #[test]
    fn test_load_routing_section() {
        let content = r#"
            [routing]
            note_take = "obsidian"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.routing.get("note_take").map(String::as_str), Some("obsidian"));
    }
}

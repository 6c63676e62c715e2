use super::*;
use crate::schema::Config;

#[test]
fn test_default_config_is_valid() {
    let result = ConfigValidator::validate(&Config::default()).unwrap();
    assert!(result.is_valid(), "{:?}", result.errors);
}

#[test]
fn test_zero_workers_rejected() {
    let mut config = Config::default();
    config.scheduler.max_concurrent_workers = 0;
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
    assert!(result
        .errors
        .iter()
        .any(|e| e.path == "scheduler.max_concurrent_workers"));
}

#[test]
fn test_zero_attempts_rejected() {
    let mut config = Config::default();
    config.scheduler.default_max_attempts = 0;
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result
        .errors
        .iter()
        .any(|e| e.path == "scheduler.default_max_attempts"));
}

#[test]
fn test_backoff_base_above_cap_rejected() {
    let mut config = Config::default();
    config.scheduler.retry_backoff_base_ms = 60_000;
    config.scheduler.retry_backoff_cap_ms = 1_000;
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
}

#[test]
fn test_threshold_out_of_range_rejected() {
    let mut config = Config::default();
    config.parser.confidence_threshold = 1.5;
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result
        .errors
        .iter()
        .any(|e| e.path == "parser.confidence_threshold"));
}

#[test]
fn test_plugin_enabled_and_disabled_conflict() {
    let mut config = Config::default();
    config.plugins.enabled = vec!["camera".into()];
    config.plugins.disabled = vec!["camera".into()];
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.message.contains("camera")));
}

#[test]
fn test_unknown_routing_category_rejected() {
    let mut config = Config::default();
    config
        .routing
        .insert("launch_rocket".into(), "rockets".into());
    config.routing.insert("note_take".into(), "obsidian".into());
    let result = ConfigValidator::validate(&config).unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path, "routing.launch_rocket");
}

#[test]
fn test_large_window_warns() {
    let mut config = Config::default();
    config.context.history_retention_count = 5;
    config.context.recent_window = 10;
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.path == "context.recent_window"));
}

#[test]
fn test_into_result() {
    let mut config = Config::default();
    config.context.history_retention_count = 0;
    let err = ConfigValidator::validate(&config)
        .unwrap()
        .into_result()
        .unwrap_err();
    assert!(err.to_string().contains("history_retention_count"));

    let warnings = ConfigValidator::validate(&Config::default())
        .unwrap()
        .into_result()
        .unwrap();
    assert!(warnings.is_empty());
}

#[test]
fn test_single_error_reports_field() {
    let mut config = Config::default();
    config.scheduler.default_task_timeout_ms = 0;
    let err = ConfigValidator::validate(&config)
        .unwrap()
        .into_result()
        .unwrap_err();
    match err {
        ConfigError::InvalidValue { field, message } => {
            assert_eq!(field, "scheduler.default_task_timeout_ms");
            assert!(message.contains("greater than 0"));
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn test_several_errors_collected() {
    let mut config = Config::default();
    config.scheduler.default_task_timeout_ms = 0;
    config.scheduler.max_concurrent_workers = 0;
    let err = ConfigValidator::validate(&config)
        .unwrap()
        .into_result()
        .unwrap_err();
    match err {
        ConfigError::Invalid(messages) => assert_eq!(messages.len(), 2),
        other => panic!("expected Invalid, got {other:?}"),
    }
}

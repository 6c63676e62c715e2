use super::*;

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.agent.name, "shivai");
    assert_eq!(config.agent.fallback_capability, "system");
    assert_eq!(config.scheduler.max_concurrent_workers, 3);
    assert_eq!(config.scheduler.default_max_attempts, 3);
    assert_eq!(config.context.history_retention_count, 500);
    assert!(config.plugins.auto_load);
    assert!(config.routing.is_empty());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_scheduler_durations() {
    let scheduler = SchedulerConfig::default();
    assert_eq!(scheduler.task_timeout(), std::time::Duration::from_secs(30));
    assert_eq!(scheduler.backoff_base(), std::time::Duration::from_secs(1));
    assert_eq!(scheduler.backoff_cap(), std::time::Duration::from_secs(30));
}

#[test]
fn test_partial_section_keeps_defaults() {
    let config: Config = toml::from_str(
        r#"
        [context]
        history_retention_count = 10
        "#,
    )
    .unwrap();
    assert_eq!(config.context.history_retention_count, 10);
    assert_eq!(config.context.recent_window, 20);
    assert!(config.context.persist);
}

#[test]
fn test_wants_enabled() {
    let plugins = PluginsConfig {
        enabled: vec!["camera".into()],
        disabled: vec!["notes".into()],
        ..Default::default()
    };
    assert!(plugins.wants_enabled("camera", false));
    assert!(!plugins.wants_enabled("notes", true));
    assert!(plugins.wants_enabled("battery", true));
    assert!(!plugins.wants_enabled("battery", false));
}

#[test]
fn test_config_serialization_round_trip() {
    let config = Config::default();
    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.scheduler.retry_backoff_cap_ms, 30_000);
}

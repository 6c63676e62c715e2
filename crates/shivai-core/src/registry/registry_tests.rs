use super::*;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;
use tempfile::TempDir;

use crate::report::BootReport;

use shivai_protocols::{
    CommandHandler, FailureKind, HandlerContext, HandlerError, Intent, PluginDescriptor,
};

const ENTRY: &str = "test::Handler";

#[derive(Default)]
struct Journal {
    initialized: Mutex<Vec<String>>,
    shut_down: Mutex<Vec<String>>,
}

impl Journal {
    fn initialized(&self) -> Vec<String> {
        self.initialized.lock().clone()
    }

    fn init_count(&self, name: &str) -> usize {
        self.initialized.lock().iter().filter(|n| *n == name).count()
    }

    fn shut_down(&self) -> Vec<String> {
        self.shut_down.lock().clone()
    }
}

struct TestHandler {
    name: String,
    capabilities: BTreeSet<String>,
    journal: Arc<Journal>,
    fail_init: bool,
    panic_init: bool,
    init_delay: Duration,
}

#[async_trait]
impl CommandHandler for TestHandler {
    async fn initialize(&self) -> Result<(), HandlerError> {
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        self.journal.initialized.lock().push(self.name.clone());
        if self.panic_init {
            panic!("init exploded");
        }
        if self.fail_init {
            return Err(HandlerError::Initialization("device offline".into()));
        }
        Ok(())
    }

    fn capabilities(&self) -> BTreeSet<String> {
        self.capabilities.clone()
    }

    async fn handle(
        &self,
        _intent: &Intent,
        _ctx: &HandlerContext,
    ) -> Result<serde_json::Value, HandlerError> {
        Ok(json!({"plugin": self.name}))
    }

    async fn shutdown(&self) -> Result<(), HandlerError> {
        self.journal.shut_down.lock().push(self.name.clone());
        Ok(())
    }
}

fn catalog(journal: &Arc<Journal>) -> Arc<HandlerCatalog> {
    let journal = journal.clone();
    let catalog = HandlerCatalog::new();
    catalog.register(
        ENTRY,
        move |d: &PluginDescriptor| -> Result<Arc<dyn CommandHandler>, HandlerError> {
            let flag = |key: &str| d.config.get(key).and_then(|v| v.as_bool()).unwrap_or(false);
            Ok(Arc::new(TestHandler {
                name: d.name.clone(),
                capabilities: d.capabilities.clone(),
                journal: journal.clone(),
                fail_init: flag("fail_init"),
                panic_init: flag("panic_init"),
                init_delay: Duration::from_millis(
                    d.config.get("init_delay_ms").and_then(|v| v.as_u64()).unwrap_or(0),
                ),
            }))
        },
    );
    Arc::new(catalog)
}

fn manifest(name: &str, capabilities: &[&str], dependencies: &[&str]) -> PluginManifest {
    let mut manifest = PluginManifest::new(name, ENTRY);
    for c in capabilities {
        manifest = manifest.with_capability(*c);
    }
    for d in dependencies {
        manifest = manifest.with_dependency(*d);
    }
    manifest
}

fn registry() -> (PluginRegistry, Arc<Journal>) {
    registry_with(PluginsConfig::default())
}

fn registry_with(config: PluginsConfig) -> (PluginRegistry, Arc<Journal>) {
    let journal = Arc::new(Journal::default());
    (PluginRegistry::with_config(catalog(&journal), config), journal)
}

fn position(order: &[String], name: &str) -> usize {
    order
        .iter()
        .position(|n| n == name)
        .unwrap_or_else(|| panic!("{} missing from {:?}", name, order))
}

#[tokio::test]
async fn test_boot_enables_in_dependency_order() {
    let (registry, journal) = registry();
    registry.register(manifest("ui", &[], &["core", "speech"])).unwrap();
    registry.register(manifest("notes", &["notes"], &["storage"])).unwrap();
    registry.register(manifest("speech", &[], &["core"])).unwrap();
    registry.register(manifest("storage", &[], &["core"])).unwrap();
    registry.register(manifest("core", &["system"], &[])).unwrap();

    let report = registry.boot().await;
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert_eq!(report.enabled.len(), 5);

    let order = journal.initialized();
    for (plugin, requires) in [
        ("ui", "core"),
        ("ui", "speech"),
        ("speech", "core"),
        ("notes", "storage"),
        ("storage", "core"),
    ] {
        assert!(
            position(&order, requires) < position(&order, plugin),
            "{} initialized before {}: {:?}",
            plugin,
            requires,
            order
        );
    }
    for info in registry.list() {
        assert_eq!(info.state, PluginState::Enabled);
    }
}

#[tokio::test]
async fn test_cycle_members_error_others_unaffected() {
    let (registry, journal) = registry();
    registry.register(manifest("a", &[], &["b"])).unwrap();
    let err = registry.register(manifest("b", &[], &["a"])).unwrap_err();
    assert!(matches!(err, PluginError::DependencyCycle { ref members } if members == &["a", "b"]));
    registry.register(manifest("c", &["notes"], &[])).unwrap();
    registry.register(manifest("d", &[], &["a"])).unwrap();

    let report = registry.boot().await;

    assert!(registry.state("a").unwrap().is_error());
    assert!(registry.state("b").unwrap().is_error());
    assert_eq!(registry.state("c"), Some(PluginState::Enabled));
    assert_eq!(report.enabled, vec!["c"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].plugin, "d");
    assert_eq!(report.failed[0].kind, FailureKind::DependencyUnsatisfied);
    assert_eq!(registry.state("d"), Some(PluginState::Validated));
    assert_eq!(journal.initialized(), vec!["c"]);
}

#[tokio::test]
async fn test_pinned_capability_wins_over_first_registered() {
    let mut config = PluginsConfig::default();
    config
        .capability_pins
        .insert("notes".to_string(), "beta".to_string());
    let (registry, _) = registry_with(config);
    registry.register(manifest("alpha", &["notes"], &[])).unwrap();
    registry.register(manifest("beta", &["notes"], &[])).unwrap();
    registry.boot().await;

    assert_eq!(registry.resolve_capability("notes").unwrap().plugin, "beta");
    assert_eq!(registry.providers("notes"), vec!["alpha", "beta"]);
}

#[tokio::test]
async fn test_first_registered_wins_without_pin() {
    let (registry, _) = registry();
    registry.register(manifest("alpha", &["notes"], &[])).unwrap();
    registry.register(manifest("beta", &["notes"], &[])).unwrap();
    registry.boot().await;

    let resolved = registry.resolve("notes").unwrap();
    assert_eq!(resolved.plugin, "alpha");
}

#[tokio::test]
async fn test_pin_falls_back_when_pinned_plugin_disabled() {
    let mut config = PluginsConfig::default();
    config
        .capability_pins
        .insert("notes".to_string(), "beta".to_string());
    let (registry, _) = registry_with(config);
    registry.register(manifest("alpha", &["notes"], &[])).unwrap();
    registry.register(manifest("beta", &["notes"], &[])).unwrap();
    registry.boot().await;

    registry.disable("beta").await.unwrap();
    assert_eq!(registry.resolve_capability("notes").unwrap().plugin, "alpha");
}

#[tokio::test]
async fn test_no_handler_available() {
    let (registry, _) = registry();
    let err = registry.resolve_capability("teleport").unwrap_err();
    assert!(matches!(err, PluginError::NoHandlerAvailable(ref c) if c == "teleport"));
    assert_eq!(err.kind(), FailureKind::NoHandlerAvailable);
}

#[tokio::test]
async fn test_disable_and_reenable_without_reinitializing() {
    let (registry, journal) = registry();
    registry.register(manifest("notes", &["notes"], &[])).unwrap();
    registry.enable("notes").await.unwrap();

    registry.disable("notes").await.unwrap();
    assert_eq!(registry.state("notes"), Some(PluginState::Disabled));
    assert!(registry.resolve_capability("notes").is_err());

    registry.enable("notes").await.unwrap();
    assert_eq!(registry.state("notes"), Some(PluginState::Enabled));
    assert!(registry.resolve_capability("notes").is_ok());
    assert_eq!(journal.init_count("notes"), 1);
}

#[tokio::test]
async fn test_init_failure_is_terminal_for_load_cycle() {
    let (registry, journal) = registry();
    registry
        .register(manifest("camera", &["device_control"], &[]).with_config(json!({"fail_init": true})))
        .unwrap();

    let err = registry.enable("camera").await.unwrap_err();
    assert!(matches!(err, PluginError::InitFailed { .. }));
    assert!(err.to_string().contains("device offline"));
    assert!(registry.state("camera").unwrap().is_error());

    let err = registry.enable("camera").await.unwrap_err();
    assert!(matches!(err, PluginError::InvalidState { .. }));
    assert_eq!(journal.init_count("camera"), 1);
}

#[tokio::test]
async fn test_init_panic_is_contained() {
    let (registry, _) = registry();
    registry
        .register(manifest("camera", &[], &[]).with_config(json!({"panic_init": true})))
        .unwrap();

    let err = registry.enable("camera").await.unwrap_err();
    assert!(err.to_string().contains("init exploded"));
    assert!(registry.state("camera").unwrap().is_error());
}

#[tokio::test]
async fn test_missing_factory_fails_load() {
    let (registry, _) = registry();
    registry
        .register(PluginManifest::new("ghost", "ghost::Missing"))
        .unwrap();

    let err = registry.load("ghost").await.unwrap_err();
    assert!(matches!(err, PluginError::EntryNotFound { .. }));
    assert!(registry.state("ghost").unwrap().is_error());
}

#[tokio::test]
async fn test_enable_blocked_by_disabled_dependency() {
    let (registry, journal) = registry();
    registry
        .register(manifest("core", &[], &[]).disabled_by_default())
        .unwrap();
    registry.register(manifest("app", &["app_control"], &["core"])).unwrap();

    let report = registry.boot().await;
    assert_eq!(report.skipped, vec!["core"]);
    assert_eq!(report.failed[0].kind, FailureKind::DependencyUnsatisfied);

    let err = registry.enable("app").await.unwrap_err();
    assert!(matches!(
        err,
        PluginError::DependencyUnsatisfied { ref plugin, ref dependency }
            if plugin == "app" && dependency == "core"
    ));
    assert!(journal.initialized().is_empty());

    registry.enable("core").await.unwrap();
    registry.enable("app").await.unwrap();
    assert_eq!(journal.initialized(), vec!["core", "app"]);
}

#[tokio::test]
async fn test_boot_waits_for_slow_dependency() {
    let (registry, journal) = registry();
    registry
        .register(manifest("core", &[], &[]).with_config(json!({"init_delay_ms": 50})))
        .unwrap();
    registry.register(manifest("fast", &[], &[])).unwrap();
    registry.register(manifest("app", &[], &["core"])).unwrap();

    let report = registry.boot().await;
    assert!(report.failed.is_empty(), "{:?}", report.failed);

    let order = journal.initialized();
    assert!(position(&order, "core") < position(&order, "app"));
    // The independent plugin does not wait behind the slow one.
    assert!(position(&order, "fast") < position(&order, "core"));
}

async fn boot_within(registry: &PluginRegistry) -> BootReport {
    tokio::time::timeout(Duration::from_secs(5), registry.boot())
        .await
        .expect("boot did not finish")
}

fn failure_kind(report: &BootReport, plugin: &str) -> Option<FailureKind> {
    report
        .failed
        .iter()
        .find(|f| f.plugin == plugin)
        .map(|f| f.kind)
}

#[tokio::test]
async fn test_boot_finishes_when_dependency_init_fails() {
    let (registry, journal) = registry();
    registry
        .register(manifest("core", &[], &[]).with_config(json!({"fail_init": true})))
        .unwrap();
    registry.register(manifest("app", &[], &["core"])).unwrap();
    registry.register(manifest("notes", &[], &[])).unwrap();

    let report = boot_within(&registry).await;

    assert_eq!(failure_kind(&report, "core"), Some(FailureKind::PluginInitFailed));
    assert_eq!(failure_kind(&report, "app"), Some(FailureKind::DependencyUnsatisfied));
    assert_eq!(report.enabled, vec!["notes"]);
    assert!(registry.state("core").unwrap().is_error());
    assert!(!registry.state("app").unwrap().is_enabled());
    assert_eq!(journal.init_count("app"), 0);
}

#[tokio::test]
async fn test_boot_finishes_when_chain_root_fails() {
    let (registry, journal) = registry();
    registry
        .register(manifest("a", &[], &[]).with_config(json!({"fail_init": true, "init_delay_ms": 20})))
        .unwrap();
    registry.register(manifest("b", &[], &["a"])).unwrap();
    registry.register(manifest("c", &[], &["b"])).unwrap();

    let report = boot_within(&registry).await;

    assert_eq!(failure_kind(&report, "a"), Some(FailureKind::PluginInitFailed));
    assert_eq!(failure_kind(&report, "b"), Some(FailureKind::DependencyUnsatisfied));
    assert_eq!(failure_kind(&report, "c"), Some(FailureKind::DependencyUnsatisfied));
    assert!(report.enabled.is_empty());
    assert_eq!(journal.initialized(), vec!["a"]);
}

#[tokio::test]
async fn test_boot_finishes_when_dependency_entry_missing() {
    let (registry, _) = registry();
    registry
        .register(PluginManifest::new("ghost", "ghost::Missing"))
        .unwrap();
    registry.register(manifest("app", &[], &["ghost"])).unwrap();

    let report = boot_within(&registry).await;

    assert_eq!(failure_kind(&report, "ghost"), Some(FailureKind::ManifestInvalid));
    assert_eq!(failure_kind(&report, "app"), Some(FailureKind::DependencyUnsatisfied));
}

#[tokio::test]
async fn test_concurrent_enable_waits_regardless_of_poll_order() {
    let (registry, journal) = registry();
    registry
        .register(manifest("core", &[], &[]).with_config(json!({"init_delay_ms": 20})))
        .unwrap();
    registry.register(manifest("app", &[], &["core"])).unwrap();

    let (app, core) = tokio::join!(registry.enable("app"), registry.enable("core"));

    assert!(app.is_ok(), "{:?}", app);
    assert!(core.is_ok(), "{:?}", core);
    assert_eq!(journal.initialized(), vec!["core", "app"]);
}

#[tokio::test]
async fn test_boot_respects_selection_lists() {
    let mut config = PluginsConfig::default();
    config.disabled.push("noisy".to_string());
    config.enabled.push("optin".to_string());
    let (registry, _) = registry_with(config);
    registry.register(manifest("noisy", &[], &[])).unwrap();
    registry
        .register(manifest("optin", &[], &[]).disabled_by_default())
        .unwrap();

    let report = registry.boot().await;
    assert_eq!(report.enabled, vec!["optin"]);
    assert_eq!(report.skipped, vec!["noisy"]);
    assert_eq!(registry.state("noisy"), Some(PluginState::Validated));
}

#[tokio::test]
async fn test_unload_strict_refuses_with_enabled_dependents() {
    let (registry, _) = registry();
    registry.register(manifest("core", &[], &[])).unwrap();
    registry.register(manifest("speech", &[], &["core"])).unwrap();
    registry.register(manifest("ui", &[], &["speech"])).unwrap();
    registry.boot().await;

    let err = registry.unload("core", UnloadMode::Strict).await.unwrap_err();
    match err {
        PluginError::InUse { plugin, dependents } => {
            assert_eq!(plugin, "core");
            assert_eq!(dependents, vec!["ui", "speech"]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(registry.state("core"), Some(PluginState::Enabled));
}

#[tokio::test]
async fn test_unload_cascade_disables_dependents_first() {
    let (registry, journal) = registry();
    registry.register(manifest("core", &[], &[])).unwrap();
    registry.register(manifest("speech", &[], &["core"])).unwrap();
    registry.register(manifest("ui", &[], &["speech"])).unwrap();
    registry.boot().await;

    registry.unload("core", UnloadMode::Cascade).await.unwrap();

    assert_eq!(registry.state("core"), Some(PluginState::Unloaded));
    assert_eq!(registry.state("speech"), Some(PluginState::Disabled));
    assert_eq!(registry.state("ui"), Some(PluginState::Disabled));
    assert_eq!(journal.shut_down(), vec!["core"]);
}

#[tokio::test]
async fn test_shutdown_unloads_dependents_first() {
    let (registry, journal) = registry();
    registry.register(manifest("core", &[], &[])).unwrap();
    registry.register(manifest("speech", &[], &["core"])).unwrap();
    registry.register(manifest("ui", &[], &["speech"])).unwrap();
    registry.boot().await;

    registry.shutdown().await;

    assert_eq!(journal.shut_down(), vec!["ui", "speech", "core"]);
    for info in registry.list() {
        assert_eq!(info.state, PluginState::Unloaded);
    }
}

#[tokio::test]
async fn test_reregister_after_unload_starts_new_cycle() {
    let (registry, journal) = registry();
    registry.register(manifest("notes", &["notes"], &[])).unwrap();
    registry.enable("notes").await.unwrap();

    assert!(matches!(
        registry.register(manifest("notes", &["notes"], &[])),
        Err(PluginError::AlreadyRegistered(_))
    ));

    registry.unload("notes", UnloadMode::Strict).await.unwrap();
    registry.register(manifest("notes", &["notes"], &[])).unwrap();
    registry.enable("notes").await.unwrap();
    assert_eq!(journal.init_count("notes"), 2);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_settings_overlay_manifest_config() {
    let mut config = PluginsConfig::default();
    config
        .settings
        .insert("camera".to_string(), json!({"quality": "low"}));
    let (registry, _) = registry_with(config);
    registry
        .register(
            manifest("camera", &["device_control"], &[])
                .with_config(json!({"quality": "high", "flash": true})),
        )
        .unwrap();
    registry.enable("camera").await.unwrap();

    let resolved = registry.resolve_capability("device_control").unwrap();
    assert_eq!(resolved.config, json!({"quality": "low", "flash": true}));
}

fn write_manifest(root: &std::path::Path, dir: &str, file: &str, content: &str) {
    let dir = root.join(dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(file), content).unwrap();
}

#[tokio::test]
async fn test_discovery_rejects_bad_manifests_and_keeps_going() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_manifest(
        root,
        "a_good",
        "manifest.json",
        &format!(
            r#"{{"name": "good", "version": "1.0.0", "entry_reference": "{}", "capabilities": ["notes"]}}"#,
            ENTRY
        ),
    );
    write_manifest(
        root,
        "b_nameless",
        "manifest.json",
        &format!(r#"{{"entry_reference": "{}"}}"#, ENTRY),
    );
    write_manifest(
        root,
        "c_selfish",
        "manifest.toml",
        &format!(
            "name = \"selfish\"\nentry_reference = \"{}\"\ndependencies = [\"selfish\"]\n",
            ENTRY
        ),
    );
    write_manifest(
        root,
        "d_badversion",
        "manifest.json",
        &format!(
            r#"{{"name": "badversion", "version": "one", "entry_reference": "{}"}}"#,
            ENTRY
        ),
    );
    write_manifest(
        root,
        "e_duplicate",
        "manifest.json",
        &format!(r#"{{"name": "good", "entry_reference": "{}"}}"#, ENTRY),
    );
    write_manifest(
        root,
        "f_legacy",
        "manifest.json",
        &format!(
            r#"{{"name": "legacy", "plugin_class": "{}", "enabled": false, "dependencies": ["good"]}}"#,
            ENTRY
        ),
    );

    let (registry, _) = registry();
    let report = registry.discover(&[root.to_path_buf()]).await;

    assert_eq!(report.discovered, vec!["good", "legacy"]);
    assert_eq!(report.rejected.len(), 4);
    assert!(report.rejected.iter().all(|r| r.kind == FailureKind::ManifestInvalid));
    assert!(report.has_errors());
    assert_eq!(report.load_order, vec!["good", "legacy"]);

    assert!(registry.state("selfish").unwrap().is_error());
    assert!(registry.state("badversion").unwrap().is_error());
    assert_eq!(registry.state("good"), Some(PluginState::Validated));

    let legacy = registry.info("legacy").unwrap();
    assert!(!legacy.descriptor.enabled_by_default);
    assert!(legacy.descriptor.source.is_some());

    let boot = registry.boot().await;
    assert_eq!(boot.enabled, vec!["good"]);
    assert_eq!(boot.skipped, vec!["legacy"]);
}

#[tokio::test]
async fn test_discovery_reports_cycles_and_missing() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    for (dir, body) in [
        ("x", r#"{"name": "x", "entry_reference": "E", "dependencies": ["y"]}"#),
        ("y", r#"{"name": "y", "entry_reference": "E", "dependencies": ["x"]}"#),
        ("z", r#"{"name": "z", "entry_reference": "E", "dependencies": ["absent"]}"#),
        ("w", r#"{"name": "w", "entry_reference": "E"}"#),
    ] {
        write_manifest(root, dir, "manifest.json", &body.replace("\"E\"", &format!("\"{}\"", ENTRY)));
    }

    let (registry, _) = registry();
    let report = registry.discover(&[root.to_path_buf()]).await;

    assert_eq!(report.cycles, vec![vec!["x".to_string(), "y".to_string()]]);
    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].dependency, "absent");
    assert!(registry.state("x").unwrap().is_error());
    assert!(registry.state("y").unwrap().is_error());
    assert_eq!(registry.state("w"), Some(PluginState::Validated));

    let boot = registry.boot().await;
    assert_eq!(boot.enabled, vec!["w"]);
    assert_eq!(boot.failed.len(), 1);
    assert_eq!(boot.failed[0].plugin, "z");
}

#[tokio::test]
async fn test_unknown_plugin_operations() {
    let (registry, _) = registry();
    assert!(matches!(registry.enable("nope").await, Err(PluginError::NotFound(_))));
    assert!(matches!(registry.disable("nope").await, Err(PluginError::NotFound(_))));
    assert!(registry.state("nope").is_none());
    assert!(registry.info("nope").is_none());
    assert!(registry.is_empty());
}

use super::*;
use serde_json::json;

#[test]
fn test_manifest_builder_validates() {
    let descriptor = PluginManifest::new("android", "android::controller")
        .with_version("1.2.0")
        .with_capability("device_control")
        .with_dependency("adb")
        .validate("builtin")
        .unwrap();

    assert_eq!(descriptor.name, "android");
    assert_eq!(descriptor.version, Version::new(1, 2, 0));
    assert!(descriptor.provides("device_control"));
    assert!(descriptor.depends_on("adb"));
    assert!(descriptor.enabled_by_default);
}

#[test]
fn test_missing_version_defaults_to_zero() {
    let descriptor = PluginManifest::new("notes", "notes::handler")
        .validate("builtin")
        .unwrap();
    assert_eq!(descriptor.version, Version::new(0, 0, 0));
}

#[test]
fn test_missing_name_rejected() {
    let manifest = PluginManifest {
        entry_reference: Some("x".into()),
        ..Default::default()
    };
    let err = manifest.validate("plugins/x/manifest.json").unwrap_err();
    assert!(matches!(err, PluginError::ManifestInvalid { .. }));
    assert!(err.to_string().contains("name"));
    assert!(err.to_string().contains("plugins/x/manifest.json"));
}

#[test]
fn test_blank_name_rejected() {
    let manifest = PluginManifest::new("   ", "x");
    assert!(manifest.validate("t").is_err());
}

#[test]
fn test_missing_entry_reference_rejected() {
    let manifest = PluginManifest {
        name: Some("camera".into()),
        ..Default::default()
    };
    let err = manifest.validate("t").unwrap_err();
    assert!(err.to_string().contains("entry_reference"));
}

#[test]
fn test_self_dependency_rejected() {
    let err = PluginManifest::new("loop", "loop::handler")
        .with_dependency("loop")
        .validate("t")
        .unwrap_err();
    assert!(err.to_string().contains("depends on itself"));
}

#[test]
fn test_bad_version_rejected() {
    let err = PluginManifest::new("camera", "camera::handler")
        .with_version("one point oh")
        .validate("t")
        .unwrap_err();
    assert!(matches!(err, PluginError::ManifestInvalid { .. }));
}

#[test]
fn test_invalid_name_characters_rejected() {
    assert!(PluginManifest::new("my plugin", "x").validate("t").is_err());
    assert!(PluginManifest::new("my-plugin_v2.0", "x").validate("t").is_ok());
}

#[test]
fn test_duplicate_capabilities_collapse() {
    let descriptor = PluginManifest::new("cam", "cam")
        .with_capability("camera")
        .with_capability(" camera ")
        .validate("t")
        .unwrap();
    assert_eq!(descriptor.capabilities.len(), 1);
}

#[test]
fn test_json_manifest_with_aliases() {
    let text = json!({
        "name": "workflow",
        "version": "2.0.0",
        "description": "Runs saved workflows",
        "author": "ShivAI",
        "plugin_class": "workflow::engine",
        "capabilities": ["workflow_engine"],
        "dependencies": [],
        "enabled": false,
        "config": {"max_steps": 10}
    })
    .to_string();

    let manifest = PluginManifest::from_json(&text, "workflow/manifest.json").unwrap();
    let descriptor = manifest.validate("workflow/manifest.json").unwrap();
    assert_eq!(descriptor.entry_reference, "workflow::engine");
    assert!(!descriptor.enabled_by_default);
    assert_eq!(descriptor.config["max_steps"], 10);
    assert_eq!(descriptor.author.as_deref(), Some("ShivAI"));
}

#[test]
fn test_toml_manifest() {
    let text = r#"
name = "battery"
version = "0.3.1"
entry_reference = "battery::reader"
capabilities = ["device_control"]
dependencies = ["adb"]

[config]
poll_seconds = 30
"#;
    let descriptor = PluginManifest::from_toml(text, "battery/manifest.toml")
        .unwrap()
        .validate("battery/manifest.toml")
        .unwrap();
    assert_eq!(descriptor.version, Version::new(0, 3, 1));
    assert!(descriptor.depends_on("adb"));
    assert_eq!(descriptor.config["poll_seconds"], 30);
}

#[test]
fn test_malformed_json_rejected() {
    let err = PluginManifest::from_json("{ not json", "bad/manifest.json").unwrap_err();
    assert!(matches!(err, PluginError::ManifestInvalid { .. }));
}

#[test]
fn test_declared_name() {
    let manifest = PluginManifest {
        name: Some("  cam ".into()),
        ..Default::default()
    };
    assert_eq!(manifest.declared_name(), Some("cam"));
    assert_eq!(PluginManifest::default().declared_name(), None);
}

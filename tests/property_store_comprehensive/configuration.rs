//! Stores opened from TOML configuration files.

use crate::common::*;
use std::fs;
use sysprops::{ContextsCandidate, Error, PropertiesConfig, SystemProperties};

fn write_config(store: &TestStore, extra_contexts: &str) -> std::path::PathBuf {
    let path = store.root().join("sysprops.toml");
    let toml = format!(
        "property_dir = {:?}\narea_size = 32768\ntrust_any_owner = true\n\n[[contexts]]\nprimary = {:?}\n{}",
        store.property_dir().display().to_string(),
        store.root().join("property_contexts").display().to_string(),
        extra_contexts,
    );
    fs::write(&path, toml).unwrap();
    path
}

#[test]
fn test_store_opened_from_config_file() {
    let store = TestStore::new();
    let path = write_config(&store, "");
    let config = PropertiesConfig::from_file(&path).unwrap();
    assert_eq!(config.area_size, 32768);
    assert_eq!(config.property_dir, store.property_dir());

    let writer = SystemProperties::open_writer(config.clone()).unwrap();
    writer.add("ro.config.loaded", "1").unwrap();

    let reader = SystemProperties::open(config).unwrap();
    assert_eq!(reader.get("ro.config.loaded").as_deref(), Some("1"));
    let size = fs::metadata(store.property_dir().join("properties_serial"))
        .unwrap()
        .len();
    assert_eq!(size, 32768);
}

#[test]
fn test_vendor_overlay_rules_merge() {
    let store = TestStore::new();
    fs::write(
        store.root().join("vendor_property_contexts"),
        "vendor.    u:object_r:vendor_prop:s0\n",
    )
    .unwrap();
    let overlay = format!(
        "overlays = [{:?}]\n",
        store
            .root()
            .join("vendor_property_contexts")
            .display()
            .to_string()
    );
    let path = write_config(&store, &overlay);
    let config = PropertiesConfig::from_file(&path).unwrap();

    let writer = SystemProperties::open_writer(config).unwrap();
    writer.add("vendor.camera", "on").unwrap();
    let context = writer.registry().context_for_name("vendor.camera").unwrap();
    assert_eq!(context.label(), "u:object_r:vendor_prop:s0");
    assert!(store
        .property_dir()
        .join("u:object_r:vendor_prop:s0")
        .exists());
}

#[test]
fn test_first_existing_candidate_wins() {
    let store = TestStore::new();
    let mut config = store.config.clone();
    config.contexts = vec![
        ContextsCandidate::single(store.root().join("missing_property_contexts")),
        ContextsCandidate::single(store.root().join("property_contexts")),
    ];
    let writer = SystemProperties::open_writer(config).unwrap();
    assert_eq!(
        writer.registry().context_for_name("ro.x").unwrap().label(),
        "u:object_r:build_prop:s0"
    );
}

#[test]
fn test_missing_contexts_is_fatal() {
    let store = TestStore::new();
    let mut config = store.config.clone();
    config.contexts = vec![ContextsCandidate::single(store.root().join("nowhere"))];
    assert!(matches!(
        SystemProperties::open_writer(config.clone()),
        Err(Error::ContextsNotFound { .. })
    ));
    assert!(matches!(
        SystemProperties::open(config),
        Err(Error::ContextsNotFound { .. })
    ));
}

#[test]
fn test_invalid_config_rejected() {
    assert!(matches!(
        PropertiesConfig::from_toml_str("area_size = 16\n"),
        Err(Error::Config(_))
    ));
    assert!(PropertiesConfig::from_toml_str("area_size = \"big\"\n").is_err());
}

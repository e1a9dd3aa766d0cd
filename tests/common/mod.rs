//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sysprops::{PropertiesConfig, SystemProperties};
use tempfile::TempDir;

/// Rule set shared by most suites.
pub const CONTEXTS: &str = "\
# build-time values
ro.                 u:object_r:build_prop:s0
persist.sys.        u:object_r:system_prop:s0
sys.                u:object_r:system_prop:s0
debug.              u:object_r:debug_prop:s0
ctl.                u:object_r:ctl_default_prop:s0
*                   u:object_r:default_prop:s0
";

// ============================================================================
// TestStore - scratch directory holding one store
// ============================================================================

/// A scratch store: rules file plus property directory in a temp dir.
pub struct TestStore {
    pub dir: TempDir,
    pub config: PropertiesConfig,
}

impl TestStore {
    /// Store using [`CONTEXTS`].
    pub fn new() -> Self {
        Self::with_contexts(CONTEXTS)
    }

    /// Store using a custom rules file.
    pub fn with_contexts(contexts: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("property_contexts"), contexts).unwrap();
        let config = PropertiesConfig {
            area_size: 64 * 1024,
            ..PropertiesConfig::for_testing(dir.path())
        };
        TestStore { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn property_dir(&self) -> PathBuf {
        self.config.property_dir.clone()
    }

    /// Create the store and open it as the writer.
    pub fn writer(&self) -> SystemProperties {
        SystemProperties::open_writer(self.config.clone()).unwrap()
    }

    /// Open a fresh read-only instance on the existing store.
    pub fn reader(&self) -> SystemProperties {
        SystemProperties::open(self.config.clone()).unwrap()
    }
}

/// Every `(name, value)` a store can see, sorted by name.
pub fn snapshot(store: &SystemProperties) -> Vec<(String, String)> {
    let mut props = Vec::new();
    store.foreach(|info| {
        if let Some(pair) = store.read(&info) {
            props.push(pair);
        }
    });
    props.sort();
    props
}

//! Process-wide property store
//!
//! Most processes open the store exactly once and share it everywhere. The
//! instance is initialized at most once, explicitly, and lives until the
//! process exits; there is no teardown and no re-initialization.

use once_cell::sync::OnceCell;
use sysprops_core::{Error, Result};

use crate::config::PropertiesConfig;
use crate::properties::SystemProperties;

static INSTANCE: OnceCell<SystemProperties> = OnceCell::new();

fn install<F>(open: F) -> Result<&'static SystemProperties>
where
    F: FnOnce() -> Result<SystemProperties>,
{
    let mut created = false;
    let instance = INSTANCE.get_or_try_init(|| {
        created = true;
        open()
    })?;
    if !created {
        return Err(Error::AlreadyInitialized);
    }
    Ok(instance)
}

/// Open the process-wide store read-only
pub fn init(config: PropertiesConfig) -> Result<&'static SystemProperties> {
    install(|| SystemProperties::open(config))
}

/// Create the store and install this process as its writer
pub fn init_writer(config: PropertiesConfig) -> Result<&'static SystemProperties> {
    install(|| SystemProperties::open_writer(config))
}

/// The process-wide store, if initialized
pub fn get() -> Option<&'static SystemProperties> {
    INSTANCE.get()
}

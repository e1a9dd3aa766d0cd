//! Write path
//!
//! Only the writer instance mutates. Its threads are serialized by one
//! mutex; readers in this and other processes never take it.

use sysprops_core::{validate_name, validate_value, Error, Result};
use sysprops_storage::PropInfo;
use tracing::{debug, warn};

use crate::properties::SystemProperties;

impl SystemProperties {
    /// Add a new property
    ///
    /// Fails with [`Error::AlreadyExists`] when `name` already has a value;
    /// use [`SystemProperties::set`] to overwrite.
    pub fn add(&self, name: &str, value: &str) -> Result<PropInfo<'_>> {
        let writer = self.writer.as_ref().ok_or(Error::ReadOnly)?;
        let _guard = writer.serialize.lock();
        self.add_locked(name, value)
    }

    /// Replace the value behind `info` in place
    pub fn update(&self, info: &PropInfo<'_>, value: &str) -> Result<()> {
        let writer = self.writer.as_ref().ok_or(Error::ReadOnly)?;
        let _guard = writer.serialize.lock();
        self.update_locked(info, value)
    }

    /// Update `name` if present, add it otherwise
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let writer = self.writer.as_ref().ok_or(Error::ReadOnly)?;
        let _guard = writer.serialize.lock();
        match self.find(name) {
            Some(info) => self.update_locked(&info, value),
            None => self.add_locked(name, value).map(|_| ()),
        }
    }

    fn add_locked(&self, name: &str, value: &str) -> Result<PropInfo<'_>> {
        validate_name(name)?;
        validate_value(name, value)?;
        let area = self.registry.area_for_name(name).ok_or_else(|| {
            let path = self
                .registry
                .context_for_name(name)
                .map(|c| c.path().to_path_buf())
                .unwrap_or_else(|| self.registry.property_dir().to_path_buf());
            Error::unavailable(path, format!("no writable context for {}", name))
        })?;
        if area.find(name)?.is_some() {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let info = area.add(name, value).map_err(|e| {
            warn!(target: "sysprops::engine", name, error = %e, "Failed to add property");
            e
        })?;
        self.bump_area_serial()?;
        debug!(target: "sysprops::engine", name, "Property added");
        Ok(info)
    }

    fn update_locked(&self, info: &PropInfo<'_>, value: &str) -> Result<()> {
        info.update(value)?;
        self.bump_area_serial()?;
        debug!(target: "sysprops::engine", offset = info.offset(), "Property updated");
        Ok(())
    }

    fn bump_area_serial(&self) -> Result<()> {
        self.registry.serial_area().bump_serial().map(|_| ())
    }
}

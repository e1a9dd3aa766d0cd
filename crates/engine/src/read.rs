//! Read path
//!
//! Lookups never fail loudly: a malformed name, an unmapped context or a
//! corrupt area all read as "absent", with the cause logged at debug level.

use std::sync::atomic::Ordering;
use std::time::Duration;
use sysprops_core::Result;
use sysprops_storage::{notify, PropInfo};
use tracing::{debug, warn};

use crate::properties::SystemProperties;

impl SystemProperties {
    /// Handle for `name`, or `None` when it is absent or unreadable
    pub fn find(&self, name: &str) -> Option<PropInfo<'_>> {
        let area = self.registry.area_for_name(name)?;
        match area.find(name) {
            Ok(found) => found,
            Err(e) if e.is_recoverable() => {
                warn!(target: "sysprops::engine", name, error = %e, "Lookup hit a damaged area");
                None
            }
            Err(e) => {
                debug!(target: "sysprops::engine", name, error = %e, "Lookup failed");
                None
            }
        }
    }

    /// Name and value behind a handle
    pub fn read(&self, info: &PropInfo<'_>) -> Option<(String, String)> {
        let name = info.name();
        let value = info.read();
        match (name, value) {
            (Ok(name), Ok((value, _))) => Some((name, value)),
            (Err(e), _) | (_, Err(e)) => {
                warn!(target: "sysprops::engine", offset = info.offset(), error = %e, "Unreadable property");
                None
            }
        }
    }

    /// Hand a consistent `(name, value, serial)` snapshot to `f`
    pub fn read_callback<R, F>(&self, info: &PropInfo<'_>, f: F) -> Result<R>
    where
        F: FnOnce(&str, &str, u32) -> R,
    {
        info.read_with(f)
    }

    /// Value of `name`, or `None` when absent
    pub fn get(&self, name: &str) -> Option<String> {
        let info = self.find(name)?;
        self.read(&info).map(|(_, value)| value)
    }

    /// Value of `name`, or `default` when absent or empty
    pub fn get_or(&self, name: &str, default: &str) -> String {
        match self.get(name) {
            Some(value) if !value.is_empty() => value,
            _ => default.to_string(),
        }
    }

    /// Current serial of one property
    pub fn serial(&self, info: &PropInfo<'_>) -> u32 {
        info.serial().raw()
    }

    /// Current value of the store-wide change serial
    pub fn area_serial(&self) -> u32 {
        match self.registry.serial_area().serial_word() {
            Ok(word) => word.load(Ordering::Acquire),
            Err(e) => {
                warn!(target: "sysprops::engine", error = %e, "Serial area unreadable");
                u32::MAX
            }
        }
    }

    /// Block until a serial moves past `old`
    ///
    /// Waits on `info`'s serial when given, otherwise on the store-wide
    /// serial. Returns the new serial, or `None` when `timeout` elapsed.
    pub fn wait(
        &self,
        info: Option<&PropInfo<'_>>,
        old: u32,
        timeout: Option<Duration>,
    ) -> Option<u32> {
        match info {
            Some(info) => info.wait(old, timeout).map(|serial| serial.raw()),
            None => {
                let word = self.registry.serial_area().serial_word().ok()?;
                notify::wait_for_change(word, old, timeout)
            }
        }
    }

    /// Block until anything in the store changes after `old`
    pub fn wait_any(&self, old: u32) -> u32 {
        loop {
            if let Some(serial) = self.wait(None, old, None) {
                return serial;
            }
        }
    }

    /// Visit every readable property; returns how many were visited
    ///
    /// Contexts this process cannot read are skipped.
    pub fn foreach<F>(&self, mut visit: F) -> usize
    where
        F: FnMut(PropInfo<'_>),
    {
        let mut count = 0;
        for area in self.registry.areas() {
            let walked = area.foreach(|info| {
                visit(info);
                count += 1;
                true
            });
            if let Err(e) = walked {
                warn!(target: "sysprops::engine", error = %e, "Stopped walking corrupt area");
            }
        }
        count
    }

    /// The `n`th property in enumeration order
    ///
    /// Positions are stable only while nothing is added.
    pub fn find_nth(&self, n: usize) -> Option<PropInfo<'_>> {
        let mut index = 0;
        for area in self.registry.areas() {
            let mut found = None;
            let walked = area.foreach(|info| {
                if index == n {
                    found = Some(info);
                    return false;
                }
                index += 1;
                true
            });
            if let Err(e) = walked {
                warn!(target: "sysprops::engine", error = %e, "Stopped walking corrupt area");
            }
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

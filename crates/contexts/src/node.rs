//! One security context and its property area
//!
//! Readers map a context's area the first time a property routed to it is
//! touched. A context that fails its access check (or fails to map) is
//! remembered as inaccessible so later lookups skip it without another
//! syscall, until [`ContextNode::reset_access`] is called.

use once_cell::sync::OnceCell;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use sysprops_core::{Error, Result, PROP_FILENAME_MAX};
use sysprops_storage::mapper::create_backing_file;
use sysprops_storage::{PropertyArea, TrustPolicy};
use tracing::{debug, info};

use crate::security::SecurityLabeler;

/// A context label and its lazily mapped area
#[derive(Debug)]
pub struct ContextNode {
    label: String,
    path: PathBuf,
    area: OnceCell<PropertyArea>,
    no_access: AtomicBool,
}

impl ContextNode {
    /// A context whose area lives at `<dir>/<label>`
    pub fn new(dir: &Path, label: &str) -> Result<Self> {
        let path = area_path(dir, label)?;
        Ok(ContextNode {
            label: label.to_string(),
            path,
            area: OnceCell::new(),
            no_access: AtomicBool::new(false),
        })
    }

    /// The security label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Backing file of this context's area
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The area, if it has been mapped
    pub fn area(&self) -> Option<&PropertyArea> {
        self.area.get()
    }

    /// True once an access check or mapping attempt has failed
    pub fn is_denied(&self) -> bool {
        self.no_access.load(Ordering::Acquire)
    }

    /// Create and label this context's backing file, then map it writable
    pub fn create(&self, size: usize, labeler: &dyn SecurityLabeler) -> Result<&PropertyArea> {
        if let Some(area) = self.area.get() {
            return Ok(area);
        }
        let file = create_backing_file(&self.path, size)?;
        labeler.apply(&file, &self.path, &self.label)?;
        let area = PropertyArea::create_in(&file)?;
        info!(target: "sysprops::contexts", label = %self.label, path = %self.path.display(), "Created context area");
        Ok(self.area.get_or_init(|| area))
    }

    /// The area, mapping it read-only on first use
    ///
    /// Returns `None` when the context is (or was once found to be)
    /// inaccessible.
    pub fn open(&self, policy: &TrustPolicy) -> Option<&PropertyArea> {
        if let Some(area) = self.area.get() {
            return Some(area);
        }
        if self.is_denied() {
            return None;
        }
        if !self.check_access() {
            debug!(target: "sysprops::contexts", label = %self.label, "No read access to context");
            self.no_access.store(true, Ordering::Release);
            return None;
        }
        match self
            .area
            .get_or_try_init(|| PropertyArea::open_read_only(&self.path, policy))
        {
            Ok(area) => Some(area),
            Err(e) => {
                debug!(target: "sysprops::contexts", label = %self.label, error = %e, "Failed to map context area");
                self.no_access.store(true, Ordering::Release);
                None
            }
        }
    }

    /// Re-run the access check, forgetting an earlier denial
    ///
    /// A context that is no longer readable is unmapped and marked denied.
    /// Writable areas are never dropped.
    pub fn reset_access(&mut self) {
        if self.check_access() {
            self.no_access.store(false, Ordering::Release);
            return;
        }
        if self.area.get().map_or(false, |area| area.is_writable()) {
            return;
        }
        if self.area.take().is_some() {
            debug!(target: "sysprops::contexts", label = %self.label, "Unmapped context after losing access");
        }
        self.no_access.store(true, Ordering::Release);
    }

    fn check_access(&self) -> bool {
        let Ok(path) = CString::new(self.path.as_os_str().as_bytes()) else {
            return false;
        };
        // SAFETY: `path` is a valid NUL-terminated string for the call.
        unsafe { libc::access(path.as_ptr(), libc::R_OK) == 0 }
    }
}

/// `<dir>/<name>`, bounded by the on-device path limit
pub fn area_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    if path.as_os_str().len() > PROP_FILENAME_MAX {
        return Err(Error::unavailable(
            &path,
            format!("path longer than {} bytes", PROP_FILENAME_MAX),
        ));
    }
    Ok(path)
}

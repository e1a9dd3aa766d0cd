//! Writer exclusivity for a property directory
//!
//! The areas themselves enforce nothing: two writers would corrupt each
//! other's bump cursor. The engine therefore holds an exclusive advisory
//! lock on `<dir>/.writer.lock` for as long as a writer instance lives.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use sysprops_core::{Error, Result};
use tracing::debug;

/// Lock file name inside the property directory
pub const WRITER_LOCK_FILE: &str = ".writer.lock";

/// Held exclusive lock; released on drop
#[derive(Debug)]
pub struct WriterLock {
    _file: File,
    path: PathBuf,
}

impl WriterLock {
    /// Take the writer lock for `dir`, failing if another writer holds it
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(WRITER_LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| Error::WriterLocked(dir.to_path_buf()))?;
        debug!(target: "sysprops::engine", path = %path.display(), "Acquired writer lock");
        Ok(WriterLock { _file: file, path })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

//! Memory mapping of property area backing files
//!
//! This is the only module that holds a pointer into shared memory. Callers
//! address the mapping with byte offsets; every accessor checks bounds (and
//! alignment, for atomics) before touching memory, so an invalid offset read
//! out of a corrupted area becomes [`Error::InvalidOffset`] instead of a wild
//! access.
//!
//! Byte ranges are copied with relaxed per-byte atomics. The value buffer of
//! a record is overwritten in place while readers may be copying it; the
//! serial protocol in [`crate::info`] discards torn copies, and byte-wise
//! atomics keep the race itself well-defined.

use memmap2::{Mmap, MmapMut};
use std::fs::{File, OpenOptions};
use std::io;
use std::mem::ManuallyDrop;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::os::unix::io::{FromRawFd, RawFd};
use std::path::Path;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use sysprops_core::{Error, Result};
use tracing::{debug, warn};

use crate::layout::HEADER_SIZE;

/// Mode of freshly created backing files; the writer keeps its own rw fd.
const BACKING_FILE_MODE: u32 = 0o444;

/// Ownership and permission rules a file must pass before it is mapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    /// Required owner uid and gid. `None` accepts any owner.
    pub trusted_owner: Option<u32>,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        TrustPolicy {
            trusted_owner: Some(0),
        }
    }
}

impl TrustPolicy {
    /// Accept files owned by anyone (tests, unprivileged deployments)
    pub fn any_owner() -> Self {
        TrustPolicy {
            trusted_owner: None,
        }
    }

    fn check(&self, file: &File, path: &Path) -> Result<usize> {
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(Error::unavailable(path, "not a regular file"));
        }
        if let Some(owner) = self.trusted_owner {
            if meta.uid() != owner || meta.gid() != owner {
                return Err(Error::unavailable(
                    path,
                    format!("owned by {}:{}, expected {}:{}", meta.uid(), meta.gid(), owner, owner),
                ));
            }
        }
        if meta.mode() & 0o022 != 0 {
            return Err(Error::unavailable(
                path,
                format!("writable by group or others (mode {:o})", meta.mode() & 0o777),
            ));
        }
        let len = meta.len() as usize;
        if len < HEADER_SIZE {
            return Err(Error::unavailable(
                path,
                format!("{} bytes is smaller than the area header", len),
            ));
        }
        Ok(len)
    }
}

enum Backing {
    ReadOnly(#[allow(dead_code)] Mmap),
    ReadWrite(#[allow(dead_code)] MmapMut),
}

/// A mapped property area, addressed by byte offsets
pub struct AreaMemory {
    base: NonNull<u8>,
    len: usize,
    backing: Backing,
}

// SAFETY: the mapping is never unmapped while an AreaMemory exists, and every
// access to it goes through atomics (word-sized or byte-sized), so sharing
// across threads cannot produce a data race.
unsafe impl Send for AreaMemory {}
unsafe impl Sync for AreaMemory {}

impl std::fmt::Debug for AreaMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AreaMemory")
            .field("len", &self.len)
            .field("writable", &self.is_writable())
            .finish()
    }
}

impl AreaMemory {
    /// Zero-filled private mapping, not backed by any file
    pub fn anonymous(len: usize) -> Result<Self> {
        Ok(Self::owned_read_write(MmapMut::map_anon(len)?))
    }

    /// Map `file` shared and writable. The file must already be sized.
    pub fn map_read_write(file: &File) -> Result<Self> {
        // SAFETY: the writer is the only process that maps the file
        // writable, and all access to the mapping goes through atomics.
        let map = unsafe { MmapMut::map_mut(file) }?;
        Ok(Self::owned_read_write(map))
    }

    /// Map `file` shared and read-only after checking it against `policy`
    pub fn map_read_only(file: &File, policy: &TrustPolicy, path: &Path) -> Result<Self> {
        let len = policy.check(file, path)?;
        // SAFETY: the mapping is only read through atomics; concurrent writes
        // by the owning process are expected.
        let map = unsafe { Mmap::map(file) }?;
        if map.len() != len {
            return Err(Error::unavailable(path, "file changed size while mapping"));
        }
        let base = NonNull::new(map.as_ptr() as *mut u8)
            .ok_or_else(|| Error::unavailable(path, "mmap returned null"))?;
        Ok(AreaMemory {
            base,
            len: map.len(),
            backing: Backing::ReadOnly(map),
        })
    }

    fn owned_read_write(mut map: MmapMut) -> Self {
        // A zero-length anonymous map may hand back a null pointer; nothing
        // is ever dereferenced through it since every access is bounds checked.
        let base = NonNull::new(map.as_mut_ptr()).unwrap_or(NonNull::dangling());
        AreaMemory {
            base,
            len: map.len(),
            backing: Backing::ReadWrite(map),
        }
    }

    /// Size of the mapping in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the mapping has no bytes at all
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when this process mapped the area writable
    pub fn is_writable(&self) -> bool {
        matches!(self.backing, Backing::ReadWrite(_))
    }

    fn check(&self, offset: usize, size: usize, align: usize) -> Result<()> {
        let end = offset.checked_add(size);
        if offset % align != 0 || end.map_or(true, |end| end > self.len) {
            return Err(Error::InvalidOffset {
                offset,
                len: self.len,
            });
        }
        Ok(())
    }

    /// The 32-bit word at `offset`
    pub fn atomic_u32(&self, offset: usize) -> Result<&AtomicU32> {
        self.check(offset, 4, 4)?;
        // SAFETY: in bounds and 4-byte aligned (checked above); the mapping
        // lives as long as `self`.
        Ok(unsafe { &*(self.base.as_ptr().add(offset) as *const AtomicU32) })
    }

    fn atomic_u8(&self, offset: usize) -> &AtomicU8 {
        // SAFETY: callers bounds-check the whole range first.
        unsafe { &*(self.base.as_ptr().add(offset) as *const AtomicU8) }
    }

    /// Load one byte
    pub fn load_u8(&self, offset: usize) -> Result<u8> {
        self.check(offset, 1, 1)?;
        Ok(self.atomic_u8(offset).load(Ordering::Relaxed))
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`
    pub fn load_bytes(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.check(offset, dst.len(), 1)?;
        for (i, byte) in dst.iter_mut().enumerate() {
            *byte = self.atomic_u8(offset + i).load(Ordering::Relaxed);
        }
        Ok(())
    }

    /// Copy `src` into the mapping at `offset`
    pub fn store_bytes(&self, offset: usize, src: &[u8]) -> Result<()> {
        if !self.is_writable() {
            return Err(Error::ReadOnly);
        }
        self.check(offset, src.len(), 1)?;
        for (i, byte) in src.iter().enumerate() {
            self.atomic_u8(offset + i).store(*byte, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Read a NUL-terminated string of at most `max` bytes starting at `offset`
    pub fn load_cstr(&self, offset: usize, max: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for i in 0..=max {
            let byte = self.load_u8(offset + i)?;
            if byte == 0 {
                return Ok(out);
            }
            out.push(byte);
        }
        Err(Error::corrupt(format!(
            "string at offset {} is not terminated within {} bytes",
            offset, max
        )))
    }
}

/// Create a new backing file of `size` bytes
///
/// Fails if the file already exists: areas are created exactly once, by the
/// writer, and never reopened writable.
pub fn create_backing_file(path: &Path, size: usize) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .mode(BACKING_FILE_MODE)
        .custom_flags(libc::O_NOFOLLOW | libc::O_CLOEXEC)
        .open(path)
        .map_err(|e| {
            warn!(target: "sysprops::area", path = %path.display(), error = %e, "Failed to create property area");
            Error::Io(e)
        })?;
    file.set_len(size as u64)?;
    debug!(target: "sysprops::area", path = %path.display(), size, "Created property area file");
    Ok(file)
}

/// Open an existing backing file for reading
pub fn open_backing_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NOFOLLOW | libc::O_CLOEXEC)
        .open(path)
}

/// Borrow a descriptor inherited from the parent process without taking
/// ownership of it; dropping the returned value leaves `fd` open.
///
/// # Safety
///
/// `fd` must be an open descriptor for the lifetime of the returned value.
pub unsafe fn borrow_inherited_fd(fd: RawFd) -> ManuallyDrop<File> {
    ManuallyDrop::new(File::from_raw_fd(fd))
}

//! Security labels on property area files

use std::fs::File;
use std::io;
use std::path::Path;
use sysprops_core::{Error, Result};

/// Applies a security label to a freshly created area file
pub trait SecurityLabeler: Send + Sync {
    /// Label `file` (open at `path`) with `label`
    fn apply(&self, file: &File, path: &Path, label: &str) -> Result<()>;
}

/// Sets the `security.selinux` extended attribute
#[derive(Debug, Clone, Copy, Default)]
pub struct XattrLabeler;

/// Leaves files unlabelled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLabeler;

impl SecurityLabeler for NoopLabeler {
    fn apply(&self, _file: &File, _path: &Path, _label: &str) -> Result<()> {
        Ok(())
    }
}

impl SecurityLabeler for XattrLabeler {
    fn apply(&self, file: &File, path: &Path, label: &str) -> Result<()> {
        set_selinux_xattr(file, label).map_err(|source| Error::SecurityLabel {
            path: path.to_path_buf(),
            label: label.to_string(),
            source,
        })
    }
}

#[cfg(target_os = "linux")]
fn set_selinux_xattr(file: &File, label: &str) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::io::AsRawFd;

    const XATTR_NAME_SELINUX: &[u8] = b"security.selinux\0";

    let value = CString::new(label).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let bytes = value.as_bytes_with_nul();
    // SAFETY: both buffers are NUL-terminated and outlive the call.
    let rc = unsafe {
        libc::fsetxattr(
            file.as_raw_fd(),
            XATTR_NAME_SELINUX.as_ptr() as *const libc::c_char,
            bytes.as_ptr() as *const libc::c_void,
            bytes.len(),
            0,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn set_selinux_xattr(_file: &File, _label: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "security labels need Linux extended attributes",
    ))
}

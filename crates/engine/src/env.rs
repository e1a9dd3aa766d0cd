//! Inherited property workspace descriptor
//!
//! A parent process may hand down an open descriptor for the serial area in
//! an environment variable formatted as `"<fd>,<size>"`. The size is
//! informational; the mapping is sized from the file itself.

use std::os::unix::io::RawFd;
use tracing::debug;

/// Descriptor and advertised size parsed from a workspace variable
pub fn parse_workspace(value: &str) -> Option<(RawFd, Option<usize>)> {
    let mut parts = value.splitn(2, ',');
    let fd = parts.next()?.trim().parse::<RawFd>().ok()?;
    if fd < 0 {
        return None;
    }
    let size = parts.next().and_then(|s| s.trim().parse::<usize>().ok());
    Some((fd, size))
}

/// Descriptor from the environment variable `var`, if set and well formed
pub fn workspace_fd_from_env(var: &str) -> Option<RawFd> {
    let value = std::env::var(var).ok()?;
    match parse_workspace(&value) {
        Some((fd, size)) => {
            debug!(target: "sysprops::engine", var, fd, size = ?size, "Found inherited property workspace");
            Some(fd)
        }
        None => {
            debug!(target: "sysprops::engine", var, value = %value, "Ignoring malformed property workspace");
            None
        }
    }
}

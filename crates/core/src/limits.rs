//! Size limits for property names and values
//!
//! Unlike configurable limits, these are part of the area format: the value
//! record carries a fixed inline buffer and the serial word has eight bits for
//! the value length. Changing them changes the on-disk layout.
//!
//! Every check here runs before a write touches the arena, so a rejected
//! name or value never leaves a trace in shared memory.

use crate::error::{Error, Result};
use crate::name::segments;

/// Size of a name buffer, including the terminating NUL
pub const PROP_NAME_MAX: usize = 32;

/// Size of the inline value buffer, including the terminating NUL
pub const PROP_VALUE_MAX: usize = 92;

/// Longest accepted property name in bytes
pub const MAX_NAME_LEN: usize = PROP_NAME_MAX - 1;

/// Longest accepted property value in bytes
pub const MAX_VALUE_LEN: usize = PROP_VALUE_MAX - 1;

/// Longest path accepted for a backing file
pub const PROP_FILENAME_MAX: usize = 1024;

/// Validate a property name
///
/// A valid name is non-empty, at most [`MAX_NAME_LEN`] bytes, free of NUL
/// bytes, and has no empty `.`-delimited segment (so `"a..b"`, `".a"` and
/// `"a."` are all rejected).
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::MalformedName(name.to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::OversizeName {
            len: name.len(),
            max: MAX_NAME_LEN,
        });
    }
    if name.as_bytes().contains(&0) {
        return Err(Error::MalformedName(name.to_string()));
    }
    if segments(name).any(|segment| segment.bytes.is_empty()) {
        return Err(Error::MalformedName(name.to_string()));
    }
    Ok(())
}

/// Validate a property value
///
/// `name` is only used for the error message.
pub fn validate_value(name: &str, value: &str) -> Result<()> {
    if value.len() > MAX_VALUE_LEN {
        return Err(Error::OversizeValue {
            len: value.len(),
            max: MAX_VALUE_LEN,
        });
    }
    if value.as_bytes().contains(&0) {
        return Err(Error::MalformedValue(name.to_string()));
    }
    Ok(())
}

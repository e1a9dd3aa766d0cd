//! Error types for the property store
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Most of these are recovered locally by the engine: a missing property, an
//! unreadable context or a corrupt area reads as "absent". Only failures while
//! bringing the store up (no mapping file, writer unable to create its areas)
//! reach callers as hard errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for property store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the property store
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (open, mmap, fstat, ...)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A context's backing file is missing, unreadable or not trusted
    #[error("Property area unavailable at {path}: {reason}")]
    AreaUnavailable {
        /// Backing file that was checked
        path: PathBuf,
        /// Why the area could not be used
        reason: String,
    },

    /// The bump allocator ran out of arena space
    #[error("Arena exhausted: requested {requested} bytes, {available} available")]
    ArenaExhausted {
        /// Aligned size of the failed allocation
        requested: usize,
        /// Bytes left in the arena
        available: usize,
    },

    /// Name has an empty segment, an embedded NUL, or is empty
    #[error("Malformed property name: {0:?}")]
    MalformedName(String),

    /// Value contains an embedded NUL byte
    #[error("Malformed property value for {0:?}: embedded NUL byte")]
    MalformedValue(String),

    /// Name is longer than the format allows
    #[error("Property name too long: {len} bytes exceeds maximum {max}")]
    OversizeName {
        /// Actual name length in bytes
        len: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Value is longer than the inline value buffer
    #[error("Property value too long: {len} bytes exceeds maximum {max}")]
    OversizeValue {
        /// Actual value length in bytes
        len: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Header magic/version mismatch or structurally impossible contents
    #[error("Corrupt property area: {0}")]
    CorruptArea(String),

    /// An arena offset pointed outside the mapping or was misaligned
    #[error("Invalid arena offset {offset} (mapping is {len} bytes)")]
    InvalidOffset {
        /// Offending offset, relative to the mapping start
        offset: usize,
        /// Size of the mapping
        len: usize,
    },

    /// Mutation attempted through a read-only mapping or reader instance
    #[error("Property area is read-only")]
    ReadOnly,

    /// `add` called for a name that already carries a value
    #[error("Property already exists: {0}")]
    AlreadyExists(String),

    /// None of the mapping files on the search path exist
    #[error("No property contexts file found (searched {searched:?})")]
    ContextsNotFound {
        /// Every candidate path that was tried
        searched: Vec<PathBuf>,
    },

    /// A mapping file exists but yields an unusable rule set
    #[error("Invalid property contexts file {path}: {reason}")]
    InvalidContextsFile {
        /// File being parsed
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// Applying the security label to a freshly created area failed
    #[error("Failed to label {path} with {label:?}: {source}")]
    SecurityLabel {
        /// File being labelled
        path: PathBuf,
        /// Label that was being applied
        label: String,
        /// Underlying OS error
        source: io::Error,
    },

    /// Another process already holds the writer lock for this directory
    #[error("Property directory {0} is already owned by another writer")]
    WriterLocked(PathBuf),

    /// The process-wide instance was initialized twice
    #[error("System properties already initialized for this process")]
    AlreadyInitialized,

    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Convenience constructor for [`Error::CorruptArea`]
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Error::CorruptArea(reason.into())
    }

    /// Convenience constructor for [`Error::AreaUnavailable`]
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::AreaUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that only mean "this context has no visible
    /// properties" and must never surface to a reader.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::AreaUnavailable { .. }
                | Error::CorruptArea(_)
                | Error::InvalidOffset { .. }
        )
    }
}

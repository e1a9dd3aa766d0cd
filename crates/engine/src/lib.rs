//! Property store engine
//!
//! This crate ties the lower layers together:
//! - SystemProperties: the read and write paths over a context registry
//! - Configuration via `sysprops.toml`
//! - Writer exclusivity (advisory file lock plus an in-process mutex)
//! - The explicit process-wide instance
//!
//! Readers never block each other or the writer. The only blocking calls are
//! the explicit waits and the short wait a read performs while the writer is
//! mid-update.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod env;
pub mod global;
pub mod lock;
pub mod properties;
mod read;
mod write;

pub use config::PropertiesConfig;
pub use properties::SystemProperties;

//! sysprops - shared-memory system property store
//!
//! A process-shared key/value store for configuration and status flags.
//! Values live in memory-mapped area files, one per security context, and
//! are read lock-free by any number of processes while a single writer
//! process mutates them.
//!
//! # Quick Start
//!
//! ```ignore
//! use sysprops::{PropertiesConfig, SystemProperties};
//!
//! // The writer creates the store
//! let writer = SystemProperties::open_writer(PropertiesConfig::default())?;
//! writer.add("ro.debug.test", "1")?;
//!
//! // Any other process opens it read-only
//! let reader = SystemProperties::open(PropertiesConfig::default())?;
//! assert_eq!(reader.get("ro.debug.test").as_deref(), Some("1"));
//! ```
//!
//! # Architecture
//!
//! All operations go through [`SystemProperties`]. The storage, contexts and
//! core crates are re-exported for callers that need handles, rule sets or
//! the error type; the mapping internals stay private to the storage crate.

pub use sysprops_contexts::{ContextsCandidate, PropertyContexts};
pub use sysprops_core::{
    Error, Result, Serial, MAX_NAME_LEN, MAX_VALUE_LEN, PROP_NAME_MAX, PROP_VALUE_MAX,
};
pub use sysprops_engine::{global, PropertiesConfig, SystemProperties};
pub use sysprops_storage::PropInfo;

//! Storage layer for the property store
//!
//! This crate implements the shared-memory property area:
//! - AreaMemory: the only code that touches mapped bytes (mmap, bounds checks)
//! - layout: header / trie node / value record offsets
//! - PropertyArea: bump-allocated trie+BST arena with find/add/foreach
//! - PropInfo: handle to one value record, with the lock-free read protocol
//! - notify: futex-style wait/wake on serial words
//!
//! # Concurrency
//!
//! Any number of readers, in any number of processes, may use an area while
//! exactly one writer mutates it. Readers only load. Every structural
//! publication is a release store of an offset; readers load offsets with
//! acquire ordering. The area itself does not enforce single-writer access.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod area;
pub mod info;
pub mod layout;
pub mod mapper;
pub mod notify;

pub use area::PropertyArea;
pub use info::PropInfo;
pub use mapper::{AreaMemory, TrustPolicy};

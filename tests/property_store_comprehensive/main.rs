//! Property Store Integration Tests
//!
//! Exercises the public `sysprops` API end to end: a writer instance and
//! independent reader instances opened on the same scratch directory, the
//! way the property service and its clients share a store.

#[path = "../common/mod.rs"]
mod common;

mod configuration;
mod cross_mapping;
mod routing;
mod scenario;
mod stress;

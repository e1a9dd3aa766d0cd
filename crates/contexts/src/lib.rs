//! Security-context partitioning for the property store
//!
//! A property contexts file maps name prefixes to security labels. Every
//! distinct label gets its own property area file, so access to a group of
//! properties can be granted or denied by file permissions and MAC policy.
//!
//! - `property_contexts`: file format and search path
//! - `prefix`: longest-prefix routing of names to contexts
//! - `node`: one context's lazily mapped area and its access memo
//! - `security`: labelling of freshly created area files
//! - `registry`: the set of areas a process has open

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod node;
pub mod prefix;
pub mod property_contexts;
pub mod registry;
pub mod security;

pub use node::ContextNode;
pub use prefix::PrefixRules;
pub use property_contexts::{ContextsCandidate, PropertyContexts};
pub use registry::{
    create_property_dir, AccessMode, ContextRegistry, RegistryOptions, PROPERTY_DIR_MODE,
    SERIAL_AREA_LABEL, SERIAL_AREA_NAME,
};
pub use security::{NoopLabeler, SecurityLabeler, XattrLabeler};

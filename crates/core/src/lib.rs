//! Core types for the system property store
//!
//! This crate defines the foundational types shared by every layer:
//! - Error: Error type hierarchy and `Result` alias
//! - Limits: Fixed name/value maxima baked into the area format
//! - Serial: Codec for the packed per-value serial word
//! - Name: Property name validation and `.`-segment splitting

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod name;
pub mod serial;

pub use error::{Error, Result};
pub use limits::{
    validate_name, validate_value, MAX_NAME_LEN, MAX_VALUE_LEN, PROP_FILENAME_MAX, PROP_NAME_MAX,
    PROP_VALUE_MAX,
};
pub use name::{segments, Segment};
pub use serial::Serial;

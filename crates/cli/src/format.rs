//! Property → human/raw string formatting.
//!
//! Two modes:
//! - **Human** (default): `[name]: [value]`
//! - **Raw** (`--raw`): `name=value`, loadable again with `create --load`

use sysprops_core::Error;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Raw,
}

/// Format one property.
pub fn format_property(name: &str, value: &str, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => format!("[{}]: [{}]", name, value),
        OutputMode::Raw => format!("{}={}", name, value),
    }
}

/// Format an error, with a hint for the ones users can act on.
pub fn format_error(err: &Error) -> String {
    match err {
        Error::WriterLocked(_) => {
            format!("error: {}\nhint: stop the other writer before re-creating the store", err)
        }
        Error::ContextsNotFound { .. } => {
            format!("error: {}\nhint: pass --contexts or set contexts in --config", err)
        }
        Error::AreaUnavailable { .. } => format!(
            "error: {}\nhint: pass --trust-any-owner for stores not owned by root",
            err
        ),
        _ => format!("error: {}", err),
    }
}

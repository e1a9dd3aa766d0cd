//! Property contexts files
//!
//! Each non-comment line holds a property name prefix and the security label
//! of the context that owns it:
//!
//! ```text
//! # prefix            label
//! net.                u:object_r:net_radio_prop:s0
//! persist.sys.        u:object_r:system_prop:s0
//! *                   u:object_r:default_prop:s0
//! ```
//!
//! Extra tokens are ignored and lines with a single token are skipped.
//! `ctl.` prefixes are control messages that are never stored, so they get
//! no area.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use sysprops_core::{Error, Result};
use tracing::{debug, info, warn};

const CONTROL_PREFIX: &str = "ctl.";

/// One group of contexts files: a primary file plus best-effort overlays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextsCandidate {
    /// Must exist for this candidate to be chosen
    pub primary: PathBuf,
    /// Loaded after the primary when present
    #[serde(default)]
    pub overlays: Vec<PathBuf>,
}

impl ContextsCandidate {
    /// A candidate without overlays
    pub fn single(primary: impl Into<PathBuf>) -> Self {
        ContextsCandidate {
            primary: primary.into(),
            overlays: Vec::new(),
        }
    }

    /// The system search path: a legacy single file, the platform file with
    /// its vendor overlay, then the same pair at the filesystem root
    pub fn system_search_path() -> Vec<Self> {
        vec![
            ContextsCandidate::single("/property_contexts"),
            ContextsCandidate {
                primary: PathBuf::from("/system/etc/selinux/plat_property_contexts"),
                overlays: vec![PathBuf::from("/vendor/etc/selinux/nonplat_property_contexts")],
            },
            ContextsCandidate {
                primary: PathBuf::from("/plat_property_contexts"),
                overlays: vec![PathBuf::from("/nonplat_property_contexts")],
            },
        ]
    }
}

/// Parsed `prefix -> label` rules in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyContexts {
    entries: Vec<(String, String)>,
    sources: Vec<PathBuf>,
}

impl PropertyContexts {
    /// Load from the first candidate whose primary file exists
    pub fn load(search_path: &[ContextsCandidate]) -> Result<Self> {
        for candidate in search_path {
            match fs::read_to_string(&candidate.primary) {
                Ok(contents) => {
                    let mut contexts = PropertyContexts::default();
                    contexts.extend_from(&contents, &candidate.primary);
                    for overlay in &candidate.overlays {
                        match fs::read_to_string(overlay) {
                            Ok(contents) => contexts.extend_from(&contents, overlay),
                            Err(e) => {
                                debug!(target: "sysprops::contexts", path = %overlay.display(), error = %e, "Skipping contexts overlay")
                            }
                        }
                    }
                    info!(
                        target: "sysprops::contexts",
                        sources = ?contexts.sources,
                        rules = contexts.entries.len(),
                        "Loaded property contexts"
                    );
                    return Ok(contexts);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(Error::InvalidContextsFile {
                        path: candidate.primary.clone(),
                        reason: e.to_string(),
                    })
                }
            }
        }
        Err(Error::ContextsNotFound {
            searched: search_path.iter().map(|c| c.primary.clone()).collect(),
        })
    }

    /// Parse a single file's contents
    pub fn parse(contents: &str, source: &Path) -> Self {
        let mut contexts = PropertyContexts::default();
        contexts.extend_from(contents, source);
        contexts
    }

    fn extend_from(&mut self, contents: &str, source: &Path) {
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let (prefix, label) = match (tokens.next(), tokens.next()) {
                (Some(prefix), Some(label)) => (prefix, label),
                _ => continue,
            };
            if prefix.starts_with(CONTROL_PREFIX) {
                continue;
            }
            if !is_valid_label(label) {
                warn!(
                    target: "sysprops::contexts",
                    path = %source.display(),
                    line = lineno + 1,
                    label,
                    "Ignoring context label that is not a valid file name"
                );
                continue;
            }
            self.entries.push((prefix.to_string(), label.to_string()));
        }
        self.sources.push(source.to_path_buf());
    }

    /// Rules in file order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, l)| (p.as_str(), l.as_str()))
    }

    /// Files the rules were read from
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no rule was read
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<String>, L: Into<String>> FromIterator<(P, L)> for PropertyContexts {
    fn from_iter<I: IntoIterator<Item = (P, L)>>(iter: I) -> Self {
        PropertyContexts {
            entries: iter
                .into_iter()
                .map(|(p, l)| (p.into(), l.into()))
                .collect(),
            sources: Vec::new(),
        }
    }
}

/// Labels double as file names inside the property directory
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label != "."
        && label != ".."
        && !label.contains('/')
        && !label.contains('\0')
}

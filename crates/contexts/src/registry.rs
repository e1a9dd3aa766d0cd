//! The set of property areas a process has open
//!
//! A registry is built once from the property contexts rules. Readers map
//! each context's area lazily; the writer creates all of them up front along
//! with the serial area, whose header serial changes on every add and
//! update anywhere in the store.

use std::fmt;
use std::fs::DirBuilder;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use sysprops_core::{Error, Result};
use sysprops_storage::layout::DEFAULT_AREA_SIZE;
use sysprops_storage::mapper::{borrow_inherited_fd, create_backing_file};
use sysprops_storage::{PropertyArea, TrustPolicy};
use tracing::{debug, info, warn};

use crate::node::{area_path, ContextNode};
use crate::prefix::PrefixRules;
use crate::property_contexts::{ContextsCandidate, PropertyContexts};
use crate::security::{NoopLabeler, SecurityLabeler};

/// File name of the serial area inside the property directory
pub const SERIAL_AREA_NAME: &str = "properties_serial";

/// Security label of the serial area
pub const SERIAL_AREA_LABEL: &str = "u:object_r:properties_serial:s0";

/// Mode of the property directory when the writer creates it
pub const PROPERTY_DIR_MODE: u32 = 0o711;

/// How a registry maps its areas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Map existing areas read-only, on demand
    ReadOnly,
    /// Create every area and map it writable
    Writer,
}

/// Everything a registry needs besides the rules themselves
pub struct RegistryOptions {
    /// Directory holding one file per context plus the serial area
    pub property_dir: PathBuf,
    /// Where to look for property contexts files
    pub search_path: Vec<ContextsCandidate>,
    /// Size of each area file the writer creates
    pub area_size: usize,
    /// Ownership rules for files mapped read-only
    pub trust: TrustPolicy,
    /// Label applied to the serial area
    pub serial_label: String,
    /// Inherited descriptor for the serial area, used only when its file
    /// does not exist
    pub workspace_fd: Option<RawFd>,
    /// Labels files created in writer mode
    pub labeler: Box<dyn SecurityLabeler>,
}

impl RegistryOptions {
    /// Options for `property_dir` with the system search path
    pub fn new(property_dir: impl Into<PathBuf>) -> Self {
        RegistryOptions {
            property_dir: property_dir.into(),
            search_path: ContextsCandidate::system_search_path(),
            area_size: DEFAULT_AREA_SIZE,
            trust: TrustPolicy::default(),
            serial_label: SERIAL_AREA_LABEL.to_string(),
            workspace_fd: None,
            labeler: Box::new(NoopLabeler),
        }
    }
}

impl fmt::Debug for RegistryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryOptions")
            .field("property_dir", &self.property_dir)
            .field("search_path", &self.search_path)
            .field("area_size", &self.area_size)
            .field("trust", &self.trust)
            .field("serial_label", &self.serial_label)
            .field("workspace_fd", &self.workspace_fd)
            .finish_non_exhaustive()
    }
}

/// Routes property names to the areas of their security contexts
#[derive(Debug)]
pub struct ContextRegistry {
    mode: AccessMode,
    property_dir: PathBuf,
    trust: TrustPolicy,
    prefixes: PrefixRules,
    contexts: Vec<ContextNode>,
    serial: PropertyArea,
}

impl ContextRegistry {
    /// Load the contexts rules from the search path and bring up the areas
    pub fn initialize(mode: AccessMode, options: RegistryOptions) -> Result<Self> {
        let rules = PropertyContexts::load(&options.search_path)?;
        Self::with_rules(mode, options, &rules)
    }

    /// Bring up the areas for an already parsed rule set
    pub fn with_rules(
        mode: AccessMode,
        options: RegistryOptions,
        rules: &PropertyContexts,
    ) -> Result<Self> {
        if rules.is_empty() {
            return Err(Error::InvalidContextsFile {
                path: rules.sources().first().cloned().unwrap_or_default(),
                reason: "no usable prefix rules".to_string(),
            });
        }

        let mut prefixes = PrefixRules::new();
        let mut contexts: Vec<ContextNode> = Vec::new();
        for (prefix, label) in rules.entries() {
            let index = match contexts.iter().position(|c| c.label() == label) {
                Some(index) => index,
                None => {
                    contexts.push(ContextNode::new(&options.property_dir, label)?);
                    contexts.len() - 1
                }
            };
            prefixes.insert(prefix, index);
        }

        let serial = match mode {
            AccessMode::Writer => {
                create_property_dir(&options.property_dir)?;
                for context in &contexts {
                    context.create(options.area_size, options.labeler.as_ref())?;
                }
                create_serial_area(&options)?
            }
            AccessMode::ReadOnly => open_serial_area(&options)?,
        };

        info!(
            target: "sysprops::contexts",
            mode = ?mode,
            dir = %options.property_dir.display(),
            contexts = contexts.len(),
            prefixes = prefixes.len(),
            "Context registry initialized"
        );
        Ok(ContextRegistry {
            mode,
            property_dir: options.property_dir,
            trust: options.trust,
            prefixes,
            contexts,
            serial,
        })
    }

    /// How this registry maps its areas
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Directory holding the area files
    pub fn property_dir(&self) -> &Path {
        &self.property_dir
    }

    /// The area carrying the store-wide change serial
    pub fn serial_area(&self) -> &PropertyArea {
        &self.serial
    }

    /// Contexts in the order they first appear in the rules
    pub fn contexts(&self) -> &[ContextNode] {
        &self.contexts
    }

    /// Prefix rules in match order
    pub fn prefixes(&self) -> &PrefixRules {
        &self.prefixes
    }

    /// The context `name` is routed to
    pub fn context_for_name(&self, name: &str) -> Option<&ContextNode> {
        self.prefixes.lookup(name).map(|index| &self.contexts[index])
    }

    /// The area `name` lives in, mapping it on first use
    ///
    /// `None` when no rule matches or the context is not accessible.
    pub fn area_for_name(&self, name: &str) -> Option<&PropertyArea> {
        let context = self.context_for_name(name)?;
        context.open(&self.trust)
    }

    /// Every accessible area, in context order
    pub fn areas(&self) -> impl Iterator<Item = &PropertyArea> + '_ {
        self.contexts.iter().filter_map(|c| c.open(&self.trust))
    }

    /// Forget remembered access denials and unmap contexts that are no
    /// longer readable
    pub fn reset_access(&mut self) {
        for context in &mut self.contexts {
            context.reset_access();
        }
        debug!(target: "sysprops::contexts", "Access checks reset");
    }
}

/// Create the property directory and any missing parents
pub fn create_property_dir(dir: &Path) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(PROPERTY_DIR_MODE)
        .create(dir)?;
    Ok(())
}

fn create_serial_area(options: &RegistryOptions) -> Result<PropertyArea> {
    let path = area_path(&options.property_dir, SERIAL_AREA_NAME)?;
    let file = create_backing_file(&path, options.area_size)?;
    options
        .labeler
        .apply(&file, &path, &options.serial_label)?;
    PropertyArea::create_in(&file)
}

fn open_serial_area(options: &RegistryOptions) -> Result<PropertyArea> {
    let path = area_path(&options.property_dir, SERIAL_AREA_NAME)?;
    match PropertyArea::open_read_only(&path, &options.trust) {
        Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            let Some(fd) = options.workspace_fd else {
                return Err(Error::Io(e));
            };
            warn!(target: "sysprops::contexts", fd, path = %path.display(), "Serial area missing, using inherited descriptor");
            // SAFETY: the descriptor was handed to this process for exactly
            // this purpose and stays open for its lifetime; it is borrowed,
            // never closed.
            let file = unsafe { borrow_inherited_fd(fd) };
            PropertyArea::open_file_read_only(&file, &options.trust, &path)
        }
        other => other,
    }
}

//! The property store as seen by one process
//!
//! A [`SystemProperties`] is opened either as a reader, mapping each
//! context's area read-only on first use, or as the writer, which creates
//! every area and owns the directory's writer lock. Read operations live in
//! `read.rs`, mutations in `write.rs`.

use parking_lot::Mutex;
use sysprops_contexts::{create_property_dir, AccessMode, ContextRegistry, PropertyContexts};
use sysprops_core::Result;
use tracing::info;

use crate::config::PropertiesConfig;
use crate::env::workspace_fd_from_env;
use crate::lock::WriterLock;

pub(crate) struct WriterState {
    pub(crate) _lock: WriterLock,
    pub(crate) serialize: Mutex<()>,
}

/// An open property store
pub struct SystemProperties {
    pub(crate) registry: ContextRegistry,
    pub(crate) config: PropertiesConfig,
    pub(crate) writer: Option<WriterState>,
}

impl std::fmt::Debug for SystemProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemProperties")
            .field("property_dir", &self.config.property_dir)
            .field("mode", &self.registry.mode())
            .field("contexts", &self.registry.contexts().len())
            .finish()
    }
}

impl SystemProperties {
    /// Open the store read-only
    ///
    /// Fails when no contexts file is found or the serial area cannot be
    /// mapped. Individual contexts that turn out to be inaccessible later
    /// simply read as empty.
    pub fn open(config: PropertiesConfig) -> Result<Self> {
        config.validate()?;
        let workspace_fd = workspace_fd_from_env(&config.workspace_env);
        let registry =
            ContextRegistry::initialize(AccessMode::ReadOnly, config.registry_options(workspace_fd))?;
        info!(target: "sysprops::engine", dir = %config.property_dir.display(), "Opened property store");
        Ok(SystemProperties {
            registry,
            config,
            writer: None,
        })
    }

    /// Create the store and open it as its single writer
    pub fn open_writer(config: PropertiesConfig) -> Result<Self> {
        let rules = PropertyContexts::load(&config.contexts)?;
        Self::open_writer_with_rules(config, &rules)
    }

    /// Create the store from an already parsed rule set
    pub fn open_writer_with_rules(config: PropertiesConfig, rules: &PropertyContexts) -> Result<Self> {
        config.validate()?;
        create_property_dir(&config.property_dir)?;
        let lock = WriterLock::acquire(&config.property_dir)?;
        let registry =
            ContextRegistry::with_rules(AccessMode::Writer, config.registry_options(None), rules)?;
        info!(
            target: "sysprops::engine",
            dir = %config.property_dir.display(),
            area_size = config.area_size,
            "Created property store"
        );
        Ok(SystemProperties {
            registry,
            config,
            writer: Some(WriterState {
                _lock: lock,
                serialize: Mutex::new(()),
            }),
        })
    }

    /// True for the writer instance
    pub fn is_writer(&self) -> bool {
        self.writer.is_some()
    }

    /// The configuration this store was opened with
    pub fn config(&self) -> &PropertiesConfig {
        &self.config
    }

    /// The underlying context registry
    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    /// Forget remembered access denials and re-check every context
    pub fn reset_access(&mut self) {
        self.registry.reset_access();
    }
}

//! Property store configuration via `sysprops.toml`
//!
//! Every field has a default matching a standard device layout, so an empty
//! file (or no file at all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use sysprops_contexts::property_contexts::is_valid_label;
use sysprops_contexts::{
    ContextsCandidate, NoopLabeler, RegistryOptions, SecurityLabeler, XattrLabeler,
    SERIAL_AREA_LABEL,
};
use sysprops_core::{Error, Result};
use sysprops_storage::layout::DEFAULT_AREA_SIZE;
use sysprops_storage::TrustPolicy;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "sysprops.toml";

/// Smallest area the writer will create
pub const MIN_AREA_SIZE: usize = 4096;

/// Property store configuration
///
/// # Example
///
/// ```toml
/// property_dir = "/dev/__properties__"
/// area_size = 131072
///
/// [[contexts]]
/// primary = "/property_contexts"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertiesConfig {
    /// Directory holding the area files
    #[serde(default = "default_property_dir")]
    pub property_dir: PathBuf,
    /// Size in bytes of every area file the writer creates
    #[serde(default = "default_area_size")]
    pub area_size: usize,
    /// Owner (uid and gid) required of area files mapped by readers
    #[serde(default)]
    pub trusted_owner: u32,
    /// Skip the ownership check entirely
    #[serde(default)]
    pub trust_any_owner: bool,
    /// Label area files with `security.selinux` when creating them
    #[serde(default)]
    pub apply_security_labels: bool,
    /// Label of the serial area
    #[serde(default = "default_serial_label")]
    pub serial_label: String,
    /// Environment variable carrying an inherited `"<fd>,<size>"` for the
    /// serial area
    #[serde(default = "default_workspace_env")]
    pub workspace_env: String,
    /// Contexts file search path; the first candidate that exists wins
    #[serde(default = "ContextsCandidate::system_search_path")]
    pub contexts: Vec<ContextsCandidate>,
}

fn default_property_dir() -> PathBuf {
    PathBuf::from("/dev/__properties__")
}

fn default_area_size() -> usize {
    DEFAULT_AREA_SIZE
}

fn default_serial_label() -> String {
    SERIAL_AREA_LABEL.to_string()
}

fn default_workspace_env() -> String {
    "PROPERTY_WORKSPACE".to_string()
}

impl Default for PropertiesConfig {
    fn default() -> Self {
        Self {
            property_dir: default_property_dir(),
            area_size: default_area_size(),
            trusted_owner: 0,
            trust_any_owner: false,
            apply_security_labels: false,
            serial_label: default_serial_label(),
            workspace_env: default_workspace_env(),
            contexts: ContextsCandidate::system_search_path(),
        }
    }
}

impl PropertiesConfig {
    /// Configuration rooted in a scratch directory: areas under
    /// `<root>/__properties__`, rules from `<root>/property_contexts`, any
    /// file owner accepted
    pub fn for_testing(root: &Path) -> Self {
        Self {
            property_dir: root.join("__properties__"),
            contexts: vec![ContextsCandidate::single(root.join("property_contexts"))],
            trust_any_owner: true,
            ..Self::default()
        }
    }

    /// Check the values for consistency
    pub fn validate(&self) -> Result<()> {
        if self.property_dir.as_os_str().is_empty() {
            return Err(Error::Config("property_dir must not be empty".to_string()));
        }
        if self.contexts.is_empty() {
            return Err(Error::Config(
                "at least one contexts candidate is required".to_string(),
            ));
        }
        if self.area_size < MIN_AREA_SIZE || self.area_size > u32::MAX as usize {
            return Err(Error::Config(format!(
                "area_size {} must be between {} and {}",
                self.area_size,
                MIN_AREA_SIZE,
                u32::MAX
            )));
        }
        if self.area_size % 4 != 0 {
            return Err(Error::Config(format!(
                "area_size {} must be a multiple of 4",
                self.area_size
            )));
        }
        if !is_valid_label(&self.serial_label) {
            return Err(Error::Config(format!(
                "serial_label {:?} is not a valid label",
                self.serial_label
            )));
        }
        Ok(())
    }

    /// Ownership policy for read-only mappings
    pub fn trust_policy(&self) -> TrustPolicy {
        if self.trust_any_owner {
            TrustPolicy::any_owner()
        } else {
            TrustPolicy {
                trusted_owner: Some(self.trusted_owner),
            }
        }
    }

    /// Registry options derived from this configuration
    pub fn registry_options(&self, workspace_fd: Option<RawFd>) -> RegistryOptions {
        let labeler: Box<dyn SecurityLabeler> = if self.apply_security_labels {
            Box::new(XattrLabeler)
        } else {
            Box::new(NoopLabeler)
        };
        RegistryOptions {
            property_dir: self.property_dir.clone(),
            search_path: self.contexts.clone(),
            area_size: self.area_size,
            trust: self.trust_policy(),
            serial_label: self.serial_label.clone(),
            workspace_fd,
            labeler,
        }
    }

    /// Default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# Property store configuration
#
# Directory holding one area file per security context plus properties_serial
property_dir = "/dev/__properties__"

# Size of every area file created by the writer, in bytes (default: 131072)
area_size = 131072

# Area files mapped by readers must be owned by this uid and gid
trusted_owner = 0
# Set to true to accept area files owned by anyone (development only)
trust_any_owner = false

# Apply security.selinux labels to area files when creating them
apply_security_labels = false

# Label of the serial area
serial_label = "u:object_r:properties_serial:s0"

# Environment variable with an inherited "<fd>,<size>" for the serial area
workspace_env = "PROPERTY_WORKSPACE"

# Contexts file search path; the first candidate whose primary file exists
# is used, overlays are loaded when present.
[[contexts]]
primary = "/property_contexts"

[[contexts]]
primary = "/system/etc/selinux/plat_property_contexts"
overlays = ["/vendor/etc/selinux/nonplat_property_contexts"]

[[contexts]]
primary = "/plat_property_contexts"
overlays = ["/nonplat_property_contexts"]
"#
    }

    /// Parse config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PropertiesConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Write the default config file if it does not already exist
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

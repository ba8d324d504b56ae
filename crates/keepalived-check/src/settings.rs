//! Settings file loading and validation for keepalived-check

use keepalived_conf::{DEFAULT_MAX_INCLUDE_DEPTH, LoaderOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::status::DEFAULT_PRIORITY_THRESHOLD;

/// Default location of the keepalived configuration.
pub const DEFAULT_CONF_PATH: &str = "/etc/keepalived/keepalived.conf";

/// Settings error types
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid settings: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub keepalived: KeepalivedSettings,

    #[serde(default)]
    pub status: StatusSettings,

    #[serde(default)]
    pub checks: CheckSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Settings {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.keepalived.validate()?;
        self.status.validate()?;
        Ok(())
    }
}

/// Where the keepalived configuration lives and how it is loaded
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct KeepalivedSettings {
    #[validate(length(min = 1), custom = "validate_config_path")]
    pub config_path: String,

    #[validate(range(min = 1, max = 256))]
    pub max_include_depth: usize,
}

/// Host status comparison settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StatusSettings {
    /// Instances with at least this priority are expected to hold their VIPs.
    #[validate(range(max = 255))]
    pub priority_threshold: u32,
}

/// Which phases run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckSettings {
    pub config: bool,
    pub status: bool,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

// Default implementations

impl Default for KeepalivedSettings {
    fn default() -> Self {
        Self {
            config_path: DEFAULT_CONF_PATH.to_string(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            priority_threshold: DEFAULT_PRIORITY_THRESHOLD,
        }
    }
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            config: true,
            status: true,
        }
    }
}

// Custom validators

fn validate_config_path(path: &str) -> Result<(), ValidationError> {
    if path.trim().is_empty() {
        return Err(ValidationError::new("config_path_empty"));
    }
    if path.contains('\0') {
        return Err(ValidationError::new("config_path_invalid"));
    }
    Ok(())
}

fn first_existing(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|p| p.is_file())
}

// Settings loading implementation

impl Settings {
    /// Locate and load the settings file.
    ///
    /// An explicit path wins over the search paths. Returns the file that was
    /// read, if any, so the caller can report it once logging is up.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), SettingsError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_settings_file(),
        };
        match path {
            Some(path) => Ok((Self::load_from_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate settings from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_yaml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Find settings file in standard locations
    fn find_settings_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/keepalived-check/settings.yaml")];

        if let Some(home_path) = Self::home_settings_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./keepalived-check.yaml"));

        first_existing(paths)
    }

    /// Get home directory settings path
    fn home_settings_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/keepalived-check/settings.yaml"))
    }

    /// Loader options derived from these settings
    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            max_include_depth: self.keepalived.max_include_depth,
        }
    }
}

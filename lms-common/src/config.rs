//! Configuration file resolution and TOML loading
//!
//! Each service reads a single TOML file. The file is located with the
//! following priority order:
//! 1. Command-line argument (highest priority)
//! 2. `LMS_CONFIG` environment variable
//! 3. User config directory: `<config_dir>/lms/<module>.toml`
//! 4. System config: `/etc/lms/<module>.toml` (Linux only)
//!
//! When no file is found the service starts on compiled defaults. A file
//! that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LMS_CONFIG";

/// Logging configuration shared by all services
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locates the TOML configuration file for one service module
#[derive(Debug, Clone)]
pub struct ConfigFileResolver {
    module_name: String,
    cli_path: Option<PathBuf>,
}

impl ConfigFileResolver {
    /// Create a resolver for `module_name` (e.g. "lms-credentials")
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_path: None,
        }
    }

    /// Set the path given on the command line, if any
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Resolve the config file path, or `None` when no candidate exists
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        let file_name = format!("{}.toml", self.module_name);

        if let Some(path) = dirs::config_dir().map(|d| d.join("lms").join(&file_name)) {
            if path.exists() {
                return Some(path);
            }
        }

        if cfg!(target_os = "linux") {
            let system = PathBuf::from("/etc/lms").join(&file_name);
            if system.exists() {
                return Some(system);
            }
        }

        None
    }
}

/// Load a whole TOML config file into `T`
///
/// Missing path or missing file → warning and `T::default()`.
/// Unreadable or malformed file → `Error::Config`.
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        warn!("No configuration file found, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!(
            "Configuration file {} does not exist, using compiled defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Load one (possibly nested, dot-separated) table from a TOML file
///
/// Returns `Ok(None)` when the file has no such table.
pub fn load_toml_section<T>(path: &Path, section: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let root: toml::Value = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    let mut current = &root;
    for key in section.split('.') {
        match current.get(key) {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }

    let value = current
        .clone()
        .try_into::<T>()
        .map_err(|e| Error::Config(format!("Invalid [{}] section: {}", section, e)))?;
    Ok(Some(value))
}

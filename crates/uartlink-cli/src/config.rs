//! uartlink CLI configuration
//!
//! Configuration is one TOML file with a `[link]` table mapping onto
//! [`LinkConfig`] and an `[export]` table for trace export. Missing tables
//! and missing keys fall back to defaults, so a config file only states what
//! it changes. Durations use serde's table form, for example
//! `scan_timeout = { secs = 20, nanos = 0 }`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uartlink_core::LinkConfig;

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the uartlink CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Link lifecycle policy
    pub link: LinkConfig,

    /// Trace export behavior
    pub export: ExportConfig,
}

/// Trace export configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory exports are written into; the platform download directory
    /// when unset
    pub directory: Option<PathBuf>,
}

impl AppConfig {
    /// Load from the given file, else the default location, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::load_from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&raw)?)
    }

    /// The per-user configuration file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("uartlink").join("config.toml"))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

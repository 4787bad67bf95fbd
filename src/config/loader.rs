//! Configuration file loading with precedence handling.

use crate::model::PageSize;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to read a config file that exists (permissions, IO).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax or unknown fields.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },

    /// A field parsed but holds a value the viewer cannot use.
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional; anything unset falls back to the hardcoded
/// defaults in [`super::ViewerConfig`]. Corresponds to
/// `~/.config/pagegrid/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Size assumed for unmeasured pages.
    #[serde(default)]
    pub default_page_size: Option<PageSize>,

    /// Horizontal gap between pages within a row, in pixels.
    #[serde(default)]
    pub horizontal_spacing: Option<f64>,

    /// Vertical gap between rows, in pixels.
    #[serde(default)]
    pub vertical_spacing: Option<f64>,

    /// Upper bound on pages per row.
    #[serde(default)]
    pub max_pages_across: Option<usize>,

    /// Wall-clock budget of one background pagination tick, in milliseconds.
    #[serde(default)]
    pub pagination_slice_ms: Option<u64>,

    /// Pixels moved by one line scroll.
    #[serde(default)]
    pub line_scroll_amount: Option<f64>,

    /// Pixels moved by one mouse-wheel notch.
    #[serde(default)]
    pub wheel_scroll_amount: Option<f64>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

/// Default config file location: `<config_dir>/pagegrid/config.toml`.
///
/// Returns `None` when the platform exposes no config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pagegrid").join("config.toml"))
}

/// Load the viewer configuration.
///
/// Precedence: hardcoded defaults, overridden by the file at `path` (or the
/// default location when `path` is `None`). A missing file is not an error;
/// an unreadable or malformed one is.
pub fn load_config(path: Option<&Path>) -> Result<super::ViewerConfig, ConfigError> {
    let resolved = match path {
        Some(explicit) => Some(explicit.to_path_buf()),
        None => default_config_path(),
    };

    let defaults = super::ViewerConfig::default();
    let Some(file_path) = resolved else {
        return Ok(defaults);
    };
    if !file_path.exists() {
        return Ok(defaults);
    }

    let raw = std::fs::read_to_string(&file_path).map_err(|err| ConfigError::ReadError {
        path: file_path.clone(),
        reason: err.to_string(),
    })?;
    let file: ConfigFile = toml::from_str(&raw).map_err(|err| ConfigError::ParseError {
        path: file_path.clone(),
        reason: err.to_string(),
    })?;

    tracing::debug!(path = %file_path.display(), "loaded viewer config file");
    defaults.merge_file(file)
}

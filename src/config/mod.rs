//! Viewer configuration.
//!
//! Hardcoded defaults merged with an optional TOML file; the file only ever
//! overrides fields it names.

pub mod loader;

pub use loader::{load_config, ConfigError, ConfigFile};

use crate::model::PageSize;
use std::path::PathBuf;

/// Default page size used for dirty entries before the first real
/// measurement: US Letter at 96 dpi.
pub const DEFAULT_PAGE_SIZE: PageSize = PageSize {
    width: 816.0,
    height: 1056.0,
};

/// Upper bound on pages per row for the dynamic best-fit algorithm.
pub const DEFAULT_MAX_PAGES_ACROSS: usize = 32;

/// Resolved viewer configuration.
///
/// Produced by [`ViewerConfig::default`] or by merging a [`ConfigFile`] over
/// the defaults via [`ViewerConfig::merge_file`].
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Size assumed for pages that have not been measured yet.
    pub default_page_size: PageSize,
    /// Horizontal gap between pages within a row, in pixels.
    pub horizontal_spacing: f64,
    /// Vertical gap between rows, in pixels.
    pub vertical_spacing: f64,
    /// Upper bound on pages per row.
    pub max_pages_across: usize,
    /// Wall-clock budget of one background pagination tick, in milliseconds.
    pub pagination_slice_ms: u64,
    /// Pixels moved by one line scroll.
    pub line_scroll_amount: f64,
    /// Pixels moved by one mouse-wheel notch.
    pub wheel_scroll_amount: f64,
    /// Optional path for tracing output; `None` leaves logging uninitialized.
    pub log_file_path: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            horizontal_spacing: 10.0,
            vertical_spacing: 10.0,
            max_pages_across: DEFAULT_MAX_PAGES_ACROSS,
            pagination_slice_ms: 30,
            line_scroll_amount: 16.0,
            wheel_scroll_amount: 48.0,
            log_file_path: None,
        }
    }
}

impl ViewerConfig {
    /// Merge an optional config file over these values.
    ///
    /// Fields absent from the file keep their current value. Negative or
    /// non-finite spacing in the file is a configuration error, rejected
    /// here rather than surfacing later as a layout contract violation.
    pub fn merge_file(mut self, file: ConfigFile) -> Result<Self, ConfigError> {
        if let Some(size) = file.default_page_size {
            if size.is_degenerate() {
                return Err(ConfigError::InvalidValue {
                    field: "default_page_size",
                    reason: format!("{}x{} is not a valid page size", size.width, size.height),
                });
            }
            self.default_page_size = size;
        }
        if let Some(spacing) = file.horizontal_spacing {
            self.horizontal_spacing = validated_spacing("horizontal_spacing", spacing)?;
        }
        if let Some(spacing) = file.vertical_spacing {
            self.vertical_spacing = validated_spacing("vertical_spacing", spacing)?;
        }
        if let Some(max) = file.max_pages_across {
            if max == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "max_pages_across",
                    reason: "must be >= 1".to_string(),
                });
            }
            self.max_pages_across = max;
        }
        if let Some(ms) = file.pagination_slice_ms {
            self.pagination_slice_ms = ms;
        }
        if let Some(amount) = file.line_scroll_amount {
            self.line_scroll_amount = validated_spacing("line_scroll_amount", amount)?;
        }
        if let Some(amount) = file.wheel_scroll_amount {
            self.wheel_scroll_amount = validated_spacing("wheel_scroll_amount", amount)?;
        }
        if let Some(path) = file.log_file_path {
            self.log_file_path = Some(path);
        }
        Ok(self)
    }
}

fn validated_spacing(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("{value} must be finite and >= 0"),
        })
    }
}

//! Page and extent geometry in device-independent pixels.

use serde::Deserialize;

/// Size of a single page in device-independent pixels.
///
/// `PageSize::ZERO` is the fail-soft sentinel returned for out-of-range
/// queries. A measured page never stores a degenerate size; dirty cache
/// entries hold the current default estimate instead.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl PageSize {
    /// Sentinel for pages the cache knows nothing about.
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    /// Create a new page size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when this size cannot describe a real page.
    ///
    /// A degenerate size reported by the paginator is a caller bug; one
    /// stored in a dirty entry is just the not-yet-measured placeholder.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
            || !self.width.is_finite()
            || !self.height.is_finite()
    }

    /// This size with both dimensions multiplied by `scale`.
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            width: self.width * scale,
            height: self.height * scale,
        }
    }
}

/// Aggregate bounds of the whole row layout.
///
/// `width` is the widest row; `height` is the sum of all row heights.
/// Maintained incrementally on each change batch; recomputed by full scan
/// only when scale/spacing changes or a row shrinks away from the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extent {
    /// Width of the widest row in pixels.
    pub width: f64,
    /// Total height of all rows in pixels.
    pub height: f64,
}

impl Extent {
    /// An empty extent.
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };
}

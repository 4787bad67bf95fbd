//! Viewport state and queued document-layout requests.

/// How the viewport currently derives its layout. Mutually exclusive.
///
/// Entering `Thumbnails` recomputes the column count from geometry; leaving
/// it restores the column count saved by the last `SetColumns`. The two
/// offset modes bypass row recalculation entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Fixed column count at the current scale.
    #[default]
    SetColumns,
    /// Fixed column count, scale chosen so the columns fill the viewport.
    FitColumns,
    /// Scale chosen so one page fills the viewport width.
    PageWidth,
    /// Scale chosen so one page fills the viewport height.
    PageHeight,
    /// Thumbnail grid; column count chosen from viewport geometry.
    Thumbnails,
    /// Explicit scale factor.
    Zoom,
    /// Horizontal offset change only.
    SetHorizontalOffset,
    /// Vertical offset change only.
    SetVerticalOffset,
}

/// Scroll/zoom state owned exclusively by the grid viewport.
///
/// Mutated only through [`super::GridViewport`] operations, never reached
/// into by the caches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// Horizontal scroll offset in pixels.
    pub horizontal_offset: f64,
    /// Vertical scroll offset in pixels.
    pub vertical_offset: f64,
    /// Viewport width in pixels.
    pub viewport_width: f64,
    /// Viewport height in pixels.
    pub viewport_height: f64,
    /// Scale factor applied to page sizes.
    pub scale: f64,
    /// Requested column count.
    pub columns: usize,
    /// Active view mode.
    pub view_mode: ViewMode,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            horizontal_offset: 0.0,
            vertical_offset: 0.0,
            viewport_width: 0.0,
            viewport_height: 0.0,
            scale: 1.0,
            columns: 1,
            view_mode: ViewMode::SetColumns,
        }
    }
}

/// A queued document-layout request.
///
/// View operations do not run synchronously: they queue one of these,
/// processed on the next input-band pump. A pending request superseded
/// before it runs is replaced, never executed twice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutRequest {
    /// Show this many columns at the current scale.
    SetColumns(usize),
    /// Show this many columns scaled to fill the viewport width.
    FitColumns(usize),
    /// Scale one page to the viewport width.
    FitToPageWidth,
    /// Scale one page to the viewport height.
    FitToPageHeight,
    /// Switch to the thumbnail grid.
    Thumbnails,
    /// Apply an explicit scale factor.
    Zoom(f64),
    /// Set the horizontal offset; no row recalculation.
    SetHorizontalOffset(f64),
    /// Set the vertical offset; no row recalculation.
    SetVerticalOffset(f64),
}

impl LayoutRequest {
    /// The view mode this request transitions into.
    pub fn view_mode(&self) -> ViewMode {
        match self {
            Self::SetColumns(_) => ViewMode::SetColumns,
            Self::FitColumns(_) => ViewMode::FitColumns,
            Self::FitToPageWidth => ViewMode::PageWidth,
            Self::FitToPageHeight => ViewMode::PageHeight,
            Self::Thumbnails => ViewMode::Thumbnails,
            Self::Zoom(_) => ViewMode::Zoom,
            Self::SetHorizontalOffset(_) => ViewMode::SetHorizontalOffset,
            Self::SetVerticalOffset(_) => ViewMode::SetVerticalOffset,
        }
    }

    /// True for the offset-only requests that bypass row recalculation.
    pub fn is_offset_only(&self) -> bool {
        matches!(
            self,
            Self::SetHorizontalOffset(_) | Self::SetVerticalOffset(_)
        )
    }
}

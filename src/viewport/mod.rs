//! Viewport virtualization for the grid view.
//!
//! # Module Structure
//!
//! - `state`: [`ViewportState`], the [`ViewMode`] machine, and queued
//!   [`LayoutRequest`]s
//! - `visual`: [`VisualTree`] - realized page visuals kept in sync with the
//!   required page range by a three-phase diff
//! - `grid`: [`GridViewport`] - measure/arrange, scrolling, fit and zoom
//!   operations, thumbnail sizing, make-visible

pub mod grid;
pub mod state;
pub mod visual;

pub use grid::{GridViewport, ProcessedLayout};
pub use state::{LayoutRequest, ViewMode, ViewportState};
pub use visual::{PageVisual, VisualDiff, VisualTree};

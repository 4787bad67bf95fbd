//! Core value types shared across the caches.
//!
//! # Module Structure
//!
//! - `geometry`: PageSize / Extent value types
//! - `change`: typed change-record batches (page ranges, row ranges)
//! - `error`: error taxonomy for the whole crate

pub mod change;
pub mod error;
pub mod geometry;

pub use change::{coalesce_page_changes, PageCacheChange, PageCacheChangeKind, RowCacheChange};
pub use error::{LayoutError, PaginationError, ViewerError};
pub use geometry::{Extent, PageSize};

//! pagegrid - virtualized layout cache for multi-page document viewers
//!
//! Given a document that can be paginated on demand, this crate computes and
//! caches per-page sizes, groups pages into visual rows (single-column,
//! multi-column, and thumbnail grid layouts), tracks which rows and pages are
//! currently visible, and drives an asynchronous, time-sliced pagination
//! pipeline that fills in page geometry lazily.
//!
//! The data flows bottom-up as typed change batches
//! ([`layout::PageSizeCache`] → [`layout::RowLayoutCache`] →
//! [`viewport::GridViewport`]) and top-down as layout requests
//! (viewport → row cache → page cache → [`paginate::PaginationBridge`]).
//! Everything runs on one logical thread; "asynchronous" work is cooperative
//! tasks on a banded [`scheduler::TaskQueue`] that tests pump manually.

pub mod config;
pub mod layout;
pub mod logging;
pub mod model;
pub mod paginate;
pub mod scheduler;
pub mod viewport;

// Wires the caches, bridge and viewport together for a hosting viewer.
pub mod integration;

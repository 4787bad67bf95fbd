//! Error taxonomy for the layout caches and the pagination bridge.
//!
//! Three classes of failure exist, and they are deliberately kept apart:
//!
//! - **Programmer-contract violations** (recalculating rows with no page
//!   source, zero columns, negative spacing, reentrant synchronous
//!   formatting) are surfaced immediately as typed errors and never retried.
//! - **Out-of-range queries** either fail soft (`PageSizeCache::page_size`
//!   returns [`crate::model::PageSize::ZERO`]) where the call site tolerates
//!   absence, or produce a range error where the contract requires a valid
//!   index (`RowLayoutCache::row_for_page`).
//! - **Transient pagination incompleteness** is never an error: callers get a
//!   missing-page sentinel or their request is queued and replayed.

use thiserror::Error;

/// Contract violations and range errors raised by the layout caches.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    /// Row layout was requested before any page-size source was attached.
    ///
    /// This is a caller bug: the hosting viewer must attach a document
    /// before asking for rows. Never retried.
    #[error("row layout requested with no page-size source attached")]
    NoPageSource,

    /// A column count of zero can never partition pages into rows.
    #[error("column count must be >= 1 (got {0})")]
    InvalidColumnCount(usize),

    /// Page spacing must be a finite, non-negative pixel amount.
    #[error("page spacing must be finite and >= 0 (got {0})")]
    InvalidSpacing(f64),

    /// Scale must be a finite, positive factor.
    #[error("scale must be finite and > 0 (got {0})")]
    InvalidScale(f64),

    /// A page index past the end of the row cache where the contract
    /// requires a cached page.
    #[error("page {page} is beyond the row cache (cached page count {page_count})")]
    PageOutOfRange {
        /// The requested page number.
        page: usize,
        /// Number of pages currently covered by rows.
        page_count: usize,
    },

    /// A row index past the end of the row cache.
    #[error("row {row} is beyond the row cache (row count {row_count})")]
    RowOutOfRange {
        /// The requested row index.
        row: usize,
        /// Number of cached rows.
        row_count: usize,
    },
}

/// Failures raised by the pagination bridge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaginationError {
    /// The paginator reported a page with a degenerate size.
    ///
    /// Sizes must be positive and finite once a page is really measured;
    /// anything else is a contract violation in the paginator, raised
    /// rather than silently accepted.
    #[error("page {0} was measured with a degenerate size")]
    DegeneratePageSize(usize),

    /// Synchronous pagination was entered while a synchronous pagination
    /// call was already running.
    ///
    /// The reentrancy guard is an explicit busy state that rejects the
    /// nested call with this error instead of blocking or throwing.
    #[error("synchronous pagination re-entered while formatting is in progress")]
    Busy,
}

/// Top-level error for hosting viewers that drive the whole pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ViewerError {
    /// A layout-cache contract violation or range error.
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// A pagination-bridge failure.
    #[error("pagination error: {0}")]
    Pagination(#[from] PaginationError),
}

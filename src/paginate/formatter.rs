//! The consumed page-formatter collaborator.

use crate::model::PageSize;

/// Position in the document's content stream. 0-indexed.
///
/// Break records are `ContentPosition`s: the checkpoint a formatter resumes
/// from to produce "the next page" without re-formatting from the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ContentPosition(usize);

impl ContentPosition {
    /// Start of the document.
    pub const START: Self = Self(0);

    /// Create a position from a raw offset.
    pub fn new(offset: usize) -> Self {
        Self(offset)
    }

    /// Get the raw offset.
    pub fn get(&self) -> usize {
        self.0
    }
}

/// One formatted page: its measured size plus the continuation position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormattedPage {
    /// Measured size of the page.
    pub size: PageSize,
    /// Break record of the following page; `None` when the content is
    /// exhausted after this page.
    pub next: Option<ContentPosition>,
}

/// The external formatter/paginator service this crate consumes.
///
/// The formatter turns document content into pages on demand. It is the
/// *only* collaborator that knows page contents; this crate cares purely
/// about page existence and geometry.
pub trait PageFormatter {
    /// The formatter's known page count, if it can cheaply report one.
    ///
    /// A `Some` value seeds the page-size cache with dirty default-size
    /// entries before any real formatting happens.
    fn page_count_hint(&self) -> Option<usize>;

    /// True when [`PageFormatter::page_count_hint`] reports a reliable value.
    fn is_page_count_valid(&self) -> bool {
        self.page_count_hint().is_some()
    }

    /// Format the page beginning at `start`.
    ///
    /// Returns `None` when no content remains at `start`.
    fn format_page(&mut self, start: ContentPosition) -> Option<FormattedPage>;
}

/// Normalized pagination events republished by the bridge.
///
/// One background tick yields at most one coalesced `Progress` range, one
/// `PageMeasured` per newly formatted page, and at most one `Completed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaginationEvent {
    /// Pages `[start, start+count)` now exist.
    Progress {
        /// First page of the range.
        start: usize,
        /// Number of pages in the range.
        count: usize,
    },
    /// A page was formatted and its real size is known.
    PageMeasured {
        /// The measured page.
        page_number: usize,
        /// Its measured size.
        size: PageSize,
    },
    /// Pagination reached the end of the content.
    Completed {
        /// Final page count.
        page_count: usize,
    },
}

//! Authoritative per-page size cache.
//!
//! Owns one entry per page (array semantics, index order = page order) with
//! a dirty flag per entry. Dirty entries hold the best-known estimate until
//! the real page is measured; the estimate starts at the configured default
//! page size and is replaced by the first real measurement, which is also
//! retroactively painted over every dirty entry so extent estimates settle
//! before the remaining measurements land.
//!
//! Every mutation path batches its change records into one coalesced
//! notification per source event. That bound is what keeps the row cache's
//! incremental update cheap.

use crate::model::{
    coalesce_page_changes, PageCacheChange, PageCacheChangeKind, PageSize, PaginationError,
};

#[derive(Debug, Clone, Copy)]
struct PageEntry {
    size: PageSize,
    dirty: bool,
}

/// Per-page size and dirty-flag cache.
#[derive(Debug)]
pub struct PageSizeCache {
    entries: Vec<PageEntry>,
    /// The configured estimate, restored on every source change.
    initial_default: PageSize,
    /// Current estimate for unmeasured pages.
    default_size: PageSize,
    /// True once the default was captured from a real measurement.
    default_measured: bool,
    last_measured: Option<PageSize>,
    dynamic_page_sizes: bool,
    pagination_completed: bool,
    has_source: bool,
}

impl PageSizeCache {
    /// Create a cache that estimates unmeasured pages at `default_size`.
    pub fn new(default_size: PageSize) -> Self {
        Self {
            entries: Vec::new(),
            initial_default: default_size,
            default_size,
            default_measured: false,
            last_measured: None,
            dynamic_page_sizes: false,
            pagination_completed: false,
            has_source: false,
        }
    }

    /// Attach a new document source.
    ///
    /// Detaches the previous source, clears all entries (emitting one
    /// `Remove` when non-empty), resets the default estimate, and re-seeds
    /// dirty entries from the source's already-known page count if any.
    pub fn set_source(&mut self, initial_page_count: usize) -> Vec<PageCacheChange> {
        let mut batch = Vec::new();
        if !self.entries.is_empty() {
            batch.push(PageCacheChange::new(
                0,
                self.entries.len(),
                PageCacheChangeKind::Remove,
            ));
            self.entries.clear();
        }

        self.default_size = self.initial_default;
        self.default_measured = false;
        self.last_measured = None;
        self.dynamic_page_sizes = false;
        self.pagination_completed = false;
        self.has_source = true;

        if initial_page_count > 0 {
            self.entries.extend(
                std::iter::repeat(PageEntry {
                    size: self.default_size,
                    dirty: true,
                })
                .take(initial_page_count),
            );
            batch.push(PageCacheChange::new(
                0,
                initial_page_count,
                PageCacheChangeKind::Add,
            ));
        }

        tracing::debug!(initial_page_count, "page cache attached to new source");
        coalesce_page_changes(batch)
    }

    /// True when a document source is attached.
    pub fn has_source(&self) -> bool {
        self.has_source
    }

    /// Number of cached pages.
    pub fn page_count(&self) -> usize {
        self.entries.len()
    }

    /// Cached size of page `i`, or [`PageSize::ZERO`] when out of range.
    ///
    /// Never fails: absence is an expected state while pagination runs.
    pub fn page_size(&self, i: usize) -> PageSize {
        self.entries.get(i).map_or(PageSize::ZERO, |entry| entry.size)
    }

    /// True when page `i` holds an estimate, or is out of range.
    pub fn is_dirty(&self, i: usize) -> bool {
        self.entries.get(i).is_none_or(|entry| entry.dirty)
    }

    /// Current estimate used for unmeasured pages.
    pub fn default_page_size(&self) -> PageSize {
        self.default_size
    }

    /// True once measured sizes have been seen to vary across pages.
    ///
    /// Chooses the dynamic best-fit row algorithm downstream.
    pub fn is_dynamic_page_sizes(&self) -> bool {
        self.dynamic_page_sizes
    }

    /// True once the source reported the end of pagination.
    pub fn is_pagination_completed(&self) -> bool {
        self.pagination_completed
    }

    /// Handle a pagination-progress event for pages `[start, start+count)`.
    ///
    /// Ranges at/after the cache end append dirty entries; ranges wholly
    /// inside re-estimate in place; a straddling range splits into both.
    pub fn pagination_progress(&mut self, start: usize, count: usize) -> Vec<PageCacheChange> {
        debug_assert!(self.has_source, "pagination progress with no source");
        if count == 0 {
            return Vec::new();
        }

        let len = self.entries.len();
        let end = start + count;
        let mut batch = Vec::new();

        let inside_end = end.min(len);
        if start < inside_end {
            for entry in &mut self.entries[start..inside_end] {
                entry.dirty = true;
                entry.size = self.default_size;
            }
            batch.push(PageCacheChange::new(
                start,
                inside_end - start,
                PageCacheChangeKind::Update,
            ));
        }

        if end > len {
            let appended = end - len;
            self.entries.extend(
                std::iter::repeat(PageEntry {
                    size: self.default_size,
                    dirty: true,
                })
                .take(appended),
            );
            batch.push(PageCacheChange::new(len, appended, PageCacheChangeKind::Add));
        }

        coalesce_page_changes(batch)
    }

    /// Handle a page-measured completion.
    ///
    /// A degenerate size is a contract violation in the paginator and is
    /// raised rather than silently accepted. The first real measurement is
    /// captured as the default and retroactively painted over every dirty
    /// entry, batched into the same notification.
    pub fn page_measured(
        &mut self,
        page_number: usize,
        size: PageSize,
    ) -> Result<Vec<PageCacheChange>, PaginationError> {
        if size.is_degenerate() {
            return Err(PaginationError::DegeneratePageSize(page_number));
        }
        debug_assert!(self.has_source, "page measured with no source");

        let preexisting = self.entries.len();
        let mut batch = Vec::new();

        if page_number >= preexisting {
            let appended = page_number + 1 - preexisting;
            self.entries.extend(
                std::iter::repeat(PageEntry {
                    size: self.default_size,
                    dirty: true,
                })
                .take(appended),
            );
            batch.push(PageCacheChange::new(
                preexisting,
                appended,
                PageCacheChangeKind::Add,
            ));
        }

        self.entries[page_number] = PageEntry { size, dirty: false };

        // Updates are emitted in index order; entries covered by the Add
        // above are excluded so ranges in one batch never overlap.
        let mut updated = Vec::new();
        if page_number < preexisting {
            updated.push(page_number);
        }
        if !self.default_measured {
            self.default_measured = true;
            self.default_size = size;
            for (index, entry) in self.entries.iter_mut().enumerate() {
                if entry.dirty {
                    entry.size = size;
                    if index < preexisting {
                        updated.push(index);
                    }
                }
            }
        }
        updated.sort_unstable();
        updated.dedup();
        for index in updated {
            batch.push(PageCacheChange::new(index, 1, PageCacheChangeKind::Update));
        }

        if let Some(last) = self.last_measured {
            if last != size {
                self.dynamic_page_sizes = true;
            }
        }
        self.last_measured = Some(size);

        Ok(coalesce_page_changes(batch))
    }

    /// Handle the pagination-completed event.
    ///
    /// Flips the completed flag and trims the cache when the final page
    /// count shrank below the cache length.
    pub fn pagination_completed(&mut self, final_page_count: usize) -> Vec<PageCacheChange> {
        debug_assert!(self.has_source, "pagination completed with no source");
        self.pagination_completed = true;

        let len = self.entries.len();
        if final_page_count < len {
            self.entries.truncate(final_page_count);
            tracing::debug!(
                from = len,
                to = final_page_count,
                "trimmed page cache at pagination end"
            );
            return vec![PageCacheChange::new(
                final_page_count,
                len - final_page_count,
                PageCacheChangeKind::Remove,
            )];
        }
        Vec::new()
    }
}

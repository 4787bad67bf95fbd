//! Typed change records published by the caches.
//!
//! Instead of long-lived event subscriptions, each cache mutation returns one
//! batch of half-open range records describing what changed. The batch for a
//! single source event is coalesced before it leaves the cache, which is what
//! keeps the downstream incremental updates cheap.

/// What happened to a page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCacheChangeKind {
    /// Pages appended to the cache.
    Add,
    /// Existing pages re-measured or re-estimated in place.
    Update,
    /// Pages trimmed off the end of the cache.
    Remove,
}

/// A half-open range operation on the page-size cache.
///
/// Ranges within one coalesced batch never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCacheChange {
    /// First affected page index.
    pub start: usize,
    /// Number of affected pages. Always >= 1.
    pub count: usize,
    /// The kind of mutation.
    pub kind: PageCacheChangeKind,
}

impl PageCacheChange {
    /// Create a change record.
    pub fn new(start: usize, count: usize, kind: PageCacheChangeKind) -> Self {
        Self { start, count, kind }
    }

    /// One past the last affected page index.
    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

/// A row-index range that was replaced, added, or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCacheChange {
    /// First affected row index.
    pub start: usize,
    /// Number of affected rows.
    pub count: usize,
}

impl RowCacheChange {
    /// Create a row change record.
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// One past the last affected row index.
    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

/// Coalesce a batch of page changes in place.
///
/// Adjacent or overlapping ranges of the same kind merge into one record;
/// everything else keeps its relative order. Empty ranges are dropped.
pub fn coalesce_page_changes(changes: Vec<PageCacheChange>) -> Vec<PageCacheChange> {
    let mut out: Vec<PageCacheChange> = Vec::with_capacity(changes.len());
    for change in changes {
        if change.count == 0 {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.kind == change.kind && change.start <= last.end() => {
                let end = last.end().max(change.end());
                last.start = last.start.min(change.start);
                last.count = end - last.start;
            }
            _ => out.push(change),
        }
    }
    out
}

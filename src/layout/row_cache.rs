//! Pages grouped into visual rows with cumulative vertical offsets.
//!
//! Rows partition the page index space contiguously and in order:
//! `row[i].first_page + row[i].page_count == row[i+1].first_page`, and
//! `row[0].first_page == 0` once any row exists. Each row's height is the
//! tallest page in it (scaled) plus the vertical spacing; its width is the
//! sum of its page widths (scaled) plus the inter-page spacing.
//!
//! The cache is rebuilt in full when the column policy, pivot page, or
//! scale/spacing changes, and patched incrementally on page-cache change
//! batches: new pages past the last row grow the row list in place, updates
//! inside existing rows recompute only those rows and shift later offsets by
//! the height delta. The one unavoidable O(rows) scan is the extent-width
//! rescan when a row shrinks away from the current maximum.

use crate::layout::page_cache::PageSizeCache;
use crate::model::{Extent, LayoutError, PageCacheChange, PageCacheChangeKind, RowCacheChange};

/// Snap-to-next-row threshold for offset queries, in pixels.
///
/// Floating accumulation of row heights can place an exact row-boundary
/// offset numerically inside the previous row; when the visible slice of the
/// hit row would be smaller than this delta, the query resolves to the next
/// row instead. Preserved as-is from the original heuristic and pinned by
/// tests rather than re-derived.
const VISIBLE_DELTA: f64 = 0.5;

/// One visual row of pages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowInfo {
    /// First page in the row.
    pub first_page: usize,
    /// Number of pages in the row. Always >= 1.
    pub page_count: usize,
    /// Row width: scaled page widths plus inter-page spacing.
    pub width: f64,
    /// Row height: tallest scaled page plus vertical spacing.
    pub height: f64,
    /// Running sum of all prior rows' heights.
    pub vertical_offset: f64,
}

impl RowInfo {
    /// One past the last page in the row.
    pub fn end_page(&self) -> usize {
        self.first_page + self.page_count
    }

    /// True when `page` belongs to this row.
    pub fn contains_page(&self, page: usize) -> bool {
        page >= self.first_page && page < self.end_page()
    }

    /// Bottom edge of the row.
    pub fn bottom(&self) -> f64 {
        self.vertical_offset + self.height
    }
}

/// Completed-layout event: the rebuilt cache plus its pivot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayoutCompleted {
    /// Row containing the pivot page of the rebuild.
    pub pivot_row: usize,
    /// Aggregate change spanning the whole cache.
    pub change: RowCacheChange,
}

/// Result of a full row recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLayoutOutcome {
    /// The layout was rebuilt.
    Completed(RowLayoutCompleted),
    /// Too few pages existed and pagination is still running; the request
    /// was stored and replays once enough pages arrive.
    Deferred,
}

/// Result of applying one page-cache change batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowUpdate {
    /// Row ranges that changed, in emission order.
    pub changes: Vec<RowCacheChange>,
    /// Present when this batch replayed a deferred full layout.
    pub completed: Option<RowLayoutCompleted>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowAlgorithm {
    Fixed,
    DynamicBestFit,
}

#[derive(Debug, Clone, Copy)]
struct DeferredLayout {
    pivot_page: usize,
    columns: usize,
}

/// Groups the page sequence into rows and answers offset queries.
#[derive(Debug)]
pub struct RowLayoutCache {
    rows: Vec<RowInfo>,
    extent: Extent,
    scale: f64,
    horizontal_spacing: f64,
    vertical_spacing: f64,
    max_pages_across: usize,
    columns: usize,
    pivot_row: usize,
    /// Reference width for growing dynamic rows past the pivot.
    pivot_row_width: f64,
    algorithm: RowAlgorithm,
    deferred: Option<DeferredLayout>,
    has_layout: bool,
}

impl RowLayoutCache {
    /// Create an empty cache with the given spacing and row-size bound.
    pub fn new(horizontal_spacing: f64, vertical_spacing: f64, max_pages_across: usize) -> Self {
        Self {
            rows: Vec::new(),
            extent: Extent::ZERO,
            scale: 1.0,
            horizontal_spacing,
            vertical_spacing,
            max_pages_across: max_pages_across.max(1),
            columns: 1,
            pivot_row: 0,
            pivot_row_width: 0.0,
            algorithm: RowAlgorithm::Fixed,
            deferred: None,
            has_layout: false,
        }
    }

    /// Number of cached rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// All cached rows, in order.
    pub fn rows(&self) -> &[RowInfo] {
        &self.rows
    }

    /// Row at `index`.
    pub fn row(&self, index: usize) -> Result<&RowInfo, LayoutError> {
        self.rows.get(index).ok_or(LayoutError::RowOutOfRange {
            row: index,
            row_count: self.rows.len(),
        })
    }

    /// Aggregate extent of all rows.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Row containing the pivot page of the last completed rebuild.
    pub fn pivot_row(&self) -> usize {
        self.pivot_row
    }

    /// Current scale factor applied to page sizes.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Column count of the last layout request.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of pages covered by the cached rows.
    pub fn covered_page_count(&self) -> usize {
        self.rows.last().map_or(0, RowInfo::end_page)
    }

    /// True when `page` falls inside a cached row.
    pub fn contains_page(&self, page: usize) -> bool {
        page < self.covered_page_count()
    }

    /// True when a full layout has completed at least once.
    pub fn has_layout(&self) -> bool {
        self.has_layout
    }

    /// Rebuild the row partition around `pivot_page` with `columns` pages
    /// per row.
    ///
    /// Defers (storing the request for replay from the next change batch)
    /// when fewer pages than `columns` exist and pagination is unfinished.
    /// Chooses the fixed partition for uniform documents and the dynamic
    /// best-fit partition once page sizes are known to vary.
    pub fn recalc_rows(
        &mut self,
        pivot_page: usize,
        columns: usize,
        pages: &PageSizeCache,
    ) -> Result<RowLayoutOutcome, LayoutError> {
        if !pages.has_source() {
            return Err(LayoutError::NoPageSource);
        }
        if columns == 0 {
            return Err(LayoutError::InvalidColumnCount(columns));
        }

        self.columns = columns;
        let page_count = pages.page_count();
        if page_count < columns && !pages.is_pagination_completed() {
            self.deferred = Some(DeferredLayout {
                pivot_page,
                columns,
            });
            tracing::debug!(page_count, columns, "row layout deferred until enough pages");
            return Ok(RowLayoutOutcome::Deferred);
        }
        self.deferred = None;

        self.algorithm = if pages.is_dynamic_page_sizes() && columns > 1 {
            RowAlgorithm::DynamicBestFit
        } else {
            RowAlgorithm::Fixed
        };

        let (partition, pivot_row) = match self.algorithm {
            RowAlgorithm::Fixed => {
                let partition = self.fixed_partition(page_count);
                let pivot_row = if page_count == 0 {
                    0
                } else {
                    pivot_page.min(page_count - 1) / columns
                };
                (partition, pivot_row)
            }
            RowAlgorithm::DynamicBestFit => self.dynamic_partition(pivot_page, columns, pages),
        };

        self.rows = partition
            .into_iter()
            .map(|(first_page, page_count)| RowInfo {
                first_page,
                page_count,
                width: 0.0,
                height: 0.0,
                vertical_offset: 0.0,
            })
            .collect();
        self.recompute_geometry(0, pages);
        self.recompute_extent();

        self.pivot_row = pivot_row;
        self.pivot_row_width = self.rows.get(pivot_row).map_or(0.0, |row| row.width);
        self.has_layout = true;

        let change = RowCacheChange::new(0, self.rows.len());
        tracing::debug!(
            rows = self.rows.len(),
            pivot_row,
            algorithm = ?self.algorithm,
            "row layout rebuilt"
        );
        Ok(RowLayoutOutcome::Completed(RowLayoutCompleted {
            pivot_row,
            change,
        }))
    }

    /// Re-derive every row's size and offset for a new scale/spacing.
    ///
    /// The row partition is untouched; this is O(pages), not a repartition,
    /// and calling it twice with unchanged values is byte-identical.
    pub fn recalc_for_scale_or_spacing(
        &mut self,
        scale: f64,
        horizontal_spacing: f64,
        vertical_spacing: f64,
        pages: &PageSizeCache,
    ) -> Result<RowCacheChange, LayoutError> {
        if !pages.has_source() {
            return Err(LayoutError::NoPageSource);
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(LayoutError::InvalidScale(scale));
        }
        for spacing in [horizontal_spacing, vertical_spacing] {
            if !(spacing.is_finite() && spacing >= 0.0) {
                return Err(LayoutError::InvalidSpacing(spacing));
            }
        }

        self.scale = scale;
        self.horizontal_spacing = horizontal_spacing;
        self.vertical_spacing = vertical_spacing;
        self.recompute_geometry(0, pages);
        self.recompute_extent();
        self.pivot_row_width = self.rows.get(self.pivot_row).map_or(0.0, |row| row.width);

        Ok(RowCacheChange::new(0, self.rows.len()))
    }

    /// Apply one coalesced page-cache change batch.
    ///
    /// Replays a deferred full layout once enough pages exist; otherwise
    /// grows rows past the current coverage, recomputes changed rows in
    /// place, or trims after removals.
    pub fn apply_page_changes(
        &mut self,
        changes: &[PageCacheChange],
        pages: &PageSizeCache,
    ) -> Result<RowUpdate, LayoutError> {
        if let Some(deferred) = self.deferred {
            if pages.page_count() >= deferred.columns || pages.is_pagination_completed() {
                let outcome =
                    self.recalc_rows(deferred.pivot_page, deferred.columns, pages)?;
                if let RowLayoutOutcome::Completed(completed) = outcome {
                    return Ok(RowUpdate {
                        changes: vec![completed.change],
                        completed: Some(completed),
                    });
                }
            }
            return Ok(RowUpdate::default());
        }
        if !self.has_layout {
            return Ok(RowUpdate::default());
        }

        let mut update = RowUpdate::default();
        for change in changes {
            match change.kind {
                PageCacheChangeKind::Remove => {
                    if let Some(completed) = self.handle_remove(pages, &mut update)? {
                        update.completed = Some(completed);
                    }
                }
                PageCacheChangeKind::Add | PageCacheChangeKind::Update => {
                    let covered = self.covered_page_count();
                    if change.start < covered {
                        let inside_end = change.end().min(covered);
                        let row_change =
                            self.update_rows_in_place(change.start, inside_end, pages)?;
                        update.changes.push(row_change);
                    }
                    if change.end() > covered {
                        if let Some(row_change) = self.grow_rows(pages) {
                            update.changes.push(row_change);
                        }
                    }
                }
            }
        }
        Ok(update)
    }

    /// Row containing `page`.
    ///
    /// Unlike the fail-soft page-size query, a page beyond the cached rows
    /// is a range error here: callers must defer until layout covers it.
    pub fn row_for_page(&self, page: usize) -> Result<&RowInfo, LayoutError> {
        let index = self.row_index_for_page(page)?;
        Ok(&self.rows[index])
    }

    /// Index of the row containing `page`.
    pub fn row_index_for_page(&self, page: usize) -> Result<usize, LayoutError> {
        if page >= self.covered_page_count() {
            return Err(LayoutError::PageOutOfRange {
                page,
                page_count: self.covered_page_count(),
            });
        }
        let after = self.rows.partition_point(|row| row.first_page <= page);
        Ok(after - 1)
    }

    /// Index of the row at vertical offset `offset`.
    ///
    /// Linear scan comparing rounded offsets with a half-open interval test;
    /// when the remaining visible slice of the hit row is smaller than the
    /// visible delta the query snaps to the next row. Offsets past the end
    /// clamp to the last row; an empty cache answers 0.
    pub fn row_index_for_vertical_offset(&self, offset: f64) -> usize {
        for (index, row) in self.rows.iter().enumerate() {
            let bottom = (row.vertical_offset + row.height).round();
            if offset < bottom {
                if bottom - offset < VISIBLE_DELTA && index + 1 < self.rows.len() {
                    return index + 1;
                }
                return index;
            }
        }
        self.rows.len().saturating_sub(1)
    }

    /// Minimal contiguous row range covering `[start_offset, end_offset)`.
    ///
    /// Returns `(first_row, count)`. Rows whose visible slice at the bottom
    /// edge would be smaller than the visible delta are excluded, matching
    /// the offset query's tie-break.
    pub fn visible_row_range(&self, start_offset: f64, end_offset: f64) -> (usize, usize) {
        if self.rows.is_empty() {
            return (0, 0);
        }
        let first = self.row_index_for_vertical_offset(start_offset);
        let mut count = 1;
        while first + count < self.rows.len() {
            let top = self.rows[first + count].vertical_offset.round();
            if top + VISIBLE_DELTA >= end_offset {
                break;
            }
            count += 1;
        }
        (first, count)
    }

    fn fixed_partition(&self, page_count: usize) -> Vec<(usize, usize)> {
        let mut partition = Vec::with_capacity(page_count.div_ceil(self.columns.max(1)));
        let mut next = 0;
        while next < page_count {
            let count = self.columns.min(page_count - next);
            partition.push((next, count));
            next += count;
        }
        partition
    }

    /// Best-fit partition anchored at the pivot page.
    ///
    /// The pivot row takes `columns` pages starting at the pivot (clamped);
    /// its width is the greedy bound for every other row, growing backward
    /// to page 0 and forward to the end, at least one and at most
    /// `max_pages_across` pages per row.
    fn dynamic_partition(
        &self,
        pivot_page: usize,
        columns: usize,
        pages: &PageSizeCache,
    ) -> (Vec<(usize, usize)>, usize) {
        let total = pages.page_count();
        if total == 0 {
            return (Vec::new(), 0);
        }
        let max_per_row = self.max_pages_across;
        let page_width = |page: usize| pages.page_size(page).width * self.scale;

        let pivot_start = pivot_page.min(total - 1);
        let pivot_count = columns.min(max_per_row).min(total - pivot_start);
        let mut pivot_width = page_width(pivot_start);
        for page in pivot_start + 1..pivot_start + pivot_count {
            pivot_width += self.horizontal_spacing + page_width(page);
        }

        let mut backward: Vec<(usize, usize)> = Vec::new();
        let mut end = pivot_start;
        while end > 0 {
            let mut first = end - 1;
            let mut width = page_width(first);
            while first > 0 && end - first < max_per_row {
                let next_width = page_width(first - 1);
                if width + self.horizontal_spacing + next_width <= pivot_width {
                    first -= 1;
                    width += self.horizontal_spacing + next_width;
                } else {
                    break;
                }
            }
            backward.push((first, end - first));
            end = first;
        }
        backward.reverse();

        let pivot_row = backward.len();
        let mut partition = backward;
        partition.push((pivot_start, pivot_count));

        let mut next = pivot_start + pivot_count;
        while next < total {
            let mut count = 1;
            let mut width = page_width(next);
            while next + count < total && count < max_per_row {
                let next_width = page_width(next + count);
                if width + self.horizontal_spacing + next_width <= pivot_width {
                    width += self.horizontal_spacing + next_width;
                    count += 1;
                } else {
                    break;
                }
            }
            partition.push((next, count));
            next += count;
        }

        (partition, pivot_row)
    }

    /// Append rows for pages past the current coverage.
    ///
    /// A short trailing row is refilled first so streaming pagination keeps
    /// rows full without repartitioning everything before them.
    fn grow_rows(&mut self, pages: &PageSizeCache) -> Option<RowCacheChange> {
        let total = pages.page_count();
        let mut first_changed = self.rows.len();

        if let Some(last) = self.rows.last() {
            let refill = match self.algorithm {
                RowAlgorithm::Fixed => last.page_count < self.columns,
                RowAlgorithm::DynamicBestFit => last.page_count < self.max_pages_across,
            };
            if refill {
                first_changed = self.rows.len() - 1;
                self.rows.pop();
            }
        }

        let mut next = self.rows.last().map_or(0, RowInfo::end_page);
        if next >= total && first_changed == self.rows.len() {
            return None;
        }
        let scale = self.scale;
        let spacing = self.horizontal_spacing;
        let pivot_width = self.pivot_row_width;
        let max_per_row = self.max_pages_across;
        let columns = self.columns;
        let algorithm = self.algorithm;
        let page_width = |page: usize| pages.page_size(page).width * scale;

        while next < total {
            let count = match algorithm {
                RowAlgorithm::Fixed => columns.min(total - next),
                RowAlgorithm::DynamicBestFit => {
                    let mut count = 1;
                    let mut width = page_width(next);
                    while next + count < total && count < max_per_row {
                        let next_width = page_width(next + count);
                        if width + spacing + next_width <= pivot_width {
                            width += spacing + next_width;
                            count += 1;
                        } else {
                            break;
                        }
                    }
                    count
                }
            };
            self.rows.push(RowInfo {
                first_page: next,
                page_count: count,
                width: 0.0,
                height: 0.0,
                vertical_offset: 0.0,
            });
            next += count;
        }

        self.recompute_geometry(first_changed, pages);
        // Growth only widens rows, so the cheap extent path is enough.
        for row in &self.rows[first_changed..] {
            if row.width > self.extent.width {
                self.extent.width = row.width;
            }
        }
        self.extent.height = self.rows.last().map_or(0.0, RowInfo::bottom);

        Some(RowCacheChange::new(
            first_changed,
            self.rows.len() - first_changed,
        ))
    }

    /// Recompute the rows covering `[page_start, page_end)` in place.
    ///
    /// A height delta shifts every later row's offset; earlier rows are
    /// untouched. Width growth beyond the extent takes the cheap path;
    /// a shrink away from the current maximum forces the one unavoidable
    /// full extent rescan.
    fn update_rows_in_place(
        &mut self,
        page_start: usize,
        page_end: usize,
        pages: &PageSizeCache,
    ) -> Result<RowCacheChange, LayoutError> {
        let first_row = self.row_index_for_page(page_start)?;
        let last_row = self.row_index_for_page(page_end - 1)?;

        let mut height_changed = false;
        let mut needs_width_rescan = false;
        for index in first_row..=last_row {
            let row = self.rows[index];
            let (width, height) = self.row_metrics(row.first_page, row.page_count, pages);
            if height != row.height {
                height_changed = true;
            }
            if width > self.extent.width {
                self.extent.width = width;
            } else if width < row.width && row.width >= self.extent.width {
                needs_width_rescan = true;
            }
            self.rows[index].width = width;
            self.rows[index].height = height;
        }

        if height_changed {
            self.recompute_offsets(first_row);
        }
        if needs_width_rescan {
            self.extent.width = self
                .rows
                .iter()
                .map(|row| row.width)
                .fold(0.0, f64::max);
        }
        if self.pivot_row >= first_row && self.pivot_row <= last_row {
            self.pivot_row_width = self.rows[self.pivot_row].width;
        }

        let count = if height_changed {
            self.rows.len() - first_row
        } else {
            last_row - first_row + 1
        };
        Ok(RowCacheChange::new(first_row, count))
    }

    /// Trim rows past the shrunken page count.
    fn handle_remove(
        &mut self,
        pages: &PageSizeCache,
        update: &mut RowUpdate,
    ) -> Result<Option<RowLayoutCompleted>, LayoutError> {
        let new_count = pages.page_count();
        let old_rows = self.rows.len();
        if old_rows == 0 {
            return Ok(None);
        }

        if new_count < self.columns && new_count > 0 && !pages.is_pagination_completed() {
            // Too few pages remain to satisfy the column policy.
            let pivot = self.rows.get(self.pivot_row).map_or(0, |row| row.first_page);
            let outcome = self.recalc_rows(pivot.min(new_count - 1), self.columns, pages)?;
            return match outcome {
                RowLayoutOutcome::Completed(completed) => {
                    update.changes.push(completed.change);
                    Ok(Some(completed))
                }
                RowLayoutOutcome::Deferred => {
                    // The rebuild is waiting for pagination; rows referencing
                    // removed pages must not linger in the meantime.
                    self.rows.clear();
                    self.recompute_extent();
                    self.pivot_row = 0;
                    self.pivot_row_width = 0.0;
                    update.changes.push(RowCacheChange::new(0, old_rows));
                    Ok(None)
                }
            };
        }

        let trim = self
            .rows
            .partition_point(|row| row.first_page < new_count);
        self.rows.truncate(trim);
        if let Some(last) = self.rows.last_mut() {
            if last.end_page() > new_count {
                last.page_count = new_count - last.first_page;
            }
        }
        if let Some(last_index) = self.rows.len().checked_sub(1) {
            self.recompute_geometry(last_index, pages);
        }
        self.recompute_extent();
        self.pivot_row = self.pivot_row.min(self.rows.len().saturating_sub(1));
        self.pivot_row_width = self.rows.get(self.pivot_row).map_or(0.0, |row| row.width);

        // The row before the trim point may have been shrunk, so the change
        // starts there.
        let first_changed = trim.saturating_sub(1);
        update
            .changes
            .push(RowCacheChange::new(first_changed, old_rows - first_changed));
        Ok(None)
    }

    fn row_metrics(&self, first_page: usize, page_count: usize, pages: &PageSizeCache) -> (f64, f64) {
        let mut width = 0.0;
        let mut tallest: f64 = 0.0;
        for page in first_page..first_page + page_count {
            let size = pages.page_size(page).scaled(self.scale);
            width += size.width;
            tallest = tallest.max(size.height);
        }
        width += page_count.saturating_sub(1) as f64 * self.horizontal_spacing;
        (width, tallest + self.vertical_spacing)
    }

    /// Recompute sizes and offsets for rows `from..`.
    fn recompute_geometry(&mut self, from: usize, pages: &PageSizeCache) {
        for index in from..self.rows.len() {
            let row = self.rows[index];
            let (width, height) = self.row_metrics(row.first_page, row.page_count, pages);
            self.rows[index].width = width;
            self.rows[index].height = height;
        }
        self.recompute_offsets(from);
    }

    /// Recompute vertical offsets for rows `from..` and the extent height.
    fn recompute_offsets(&mut self, from: usize) {
        let mut offset = if from == 0 {
            0.0
        } else {
            self.rows[from - 1].bottom()
        };
        for row in &mut self.rows[from..] {
            row.vertical_offset = offset;
            offset += row.height;
        }
        self.extent.height = self.rows.last().map_or(0.0, RowInfo::bottom);
    }

    /// Full extent recomputation: max row width, last row bottom.
    fn recompute_extent(&mut self) {
        self.extent = Extent {
            width: self.rows.iter().map(|row| row.width).fold(0.0, f64::max),
            height: self.rows.last().map_or(0.0, RowInfo::bottom),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageSize;

    const DEFAULT: PageSize = PageSize {
        width: 816.0,
        height: 1056.0,
    };

    fn uniform_pages(count: usize) -> PageSizeCache {
        let mut pages = PageSizeCache::new(DEFAULT);
        pages.set_source(count);
        pages.pagination_completed(count);
        pages
    }

    /// Like `uniform_pages`, but every page really measured at the default
    /// size, so later measurements exercise the in-place update path
    /// instead of the first-measurement repaint.
    fn measured_pages(count: usize) -> PageSizeCache {
        let mut pages = PageSizeCache::new(DEFAULT);
        pages.set_source(count);
        for page in 0..count {
            pages.page_measured(page, DEFAULT).unwrap();
        }
        pages.pagination_completed(count);
        pages
    }

    fn cache() -> RowLayoutCache {
        RowLayoutCache::new(10.0, 10.0, 32)
    }

    fn partition(rows: &RowLayoutCache) -> Vec<(usize, usize)> {
        rows.rows()
            .iter()
            .map(|row| (row.first_page, row.page_count))
            .collect()
    }

    mod full_recalc {
        use super::*;

        #[test]
        fn no_source_is_a_contract_violation() {
            let pages = PageSizeCache::new(DEFAULT);
            let mut rows = cache();
            assert_eq!(
                rows.recalc_rows(0, 2, &pages),
                Err(LayoutError::NoPageSource)
            );
        }

        #[test]
        fn zero_columns_is_a_contract_violation() {
            let pages = uniform_pages(4);
            let mut rows = cache();
            assert_eq!(
                rows.recalc_rows(0, 0, &pages),
                Err(LayoutError::InvalidColumnCount(0))
            );
        }

        #[test]
        fn ten_pages_three_columns_partition() {
            let pages = uniform_pages(10);
            let mut rows = cache();
            let outcome = rows.recalc_rows(0, 3, &pages).unwrap();

            assert_eq!(partition(&rows), vec![(0, 3), (3, 3), (6, 3), (9, 1)]);
            assert_eq!(rows.row_for_page(9).unwrap().first_page, 9);
            assert!(matches!(
                outcome,
                RowLayoutOutcome::Completed(RowLayoutCompleted {
                    pivot_row: 0,
                    change: RowCacheChange { start: 0, count: 4 },
                })
            ));
        }

        #[test]
        fn row_sizes_and_offsets_follow_page_geometry() {
            let pages = uniform_pages(4);
            let mut rows = cache();
            rows.recalc_rows(0, 2, &pages).unwrap();

            let row = rows.row(0).unwrap();
            assert_eq!(row.width, 816.0 * 2.0 + 10.0);
            assert_eq!(row.height, 1056.0 + 10.0);
            assert_eq!(rows.row(1).unwrap().vertical_offset, 1066.0);
            assert_eq!(rows.extent(), Extent { width: 1642.0, height: 2132.0 });
        }

        #[test]
        fn pivot_page_selects_pivot_row() {
            let pages = uniform_pages(10);
            let mut rows = cache();
            let outcome = rows.recalc_rows(7, 3, &pages).unwrap();
            let RowLayoutOutcome::Completed(completed) = outcome else {
                panic!("layout should complete");
            };
            assert_eq!(completed.pivot_row, 2);
            assert_eq!(rows.pivot_row(), 2);
        }

        #[test]
        fn too_few_pages_defers_until_pagination_ends() {
            let mut pages = PageSizeCache::new(DEFAULT);
            pages.set_source(2);
            let mut rows = cache();

            let outcome = rows.recalc_rows(0, 4, &pages).unwrap();
            assert_eq!(outcome, RowLayoutOutcome::Deferred);
            assert_eq!(rows.row_count(), 0);
        }

        #[test]
        fn completed_pagination_lays_out_short_documents() {
            let pages = uniform_pages(2);
            let mut rows = cache();
            let outcome = rows.recalc_rows(0, 4, &pages).unwrap();
            assert!(matches!(outcome, RowLayoutOutcome::Completed(_)));
            assert_eq!(partition(&rows), vec![(0, 2)]);
        }

        #[test]
        fn empty_completed_document_yields_no_rows() {
            let pages = uniform_pages(0);
            let mut rows = cache();
            let outcome = rows.recalc_rows(0, 1, &pages).unwrap();
            assert!(matches!(outcome, RowLayoutOutcome::Completed(_)));
            assert_eq!(rows.row_count(), 0);
            assert_eq!(rows.extent(), Extent::ZERO);
        }
    }

    mod dynamic_layout {
        use super::*;

        /// Pages 0..6 with widths 200, 100, 100, 400, 100, 100 (uniform height).
        fn varied_pages() -> PageSizeCache {
            let mut pages = PageSizeCache::new(DEFAULT);
            pages.set_source(6);
            let widths = [200.0, 100.0, 100.0, 400.0, 100.0, 100.0];
            for (index, width) in widths.iter().enumerate() {
                pages.page_measured(index, PageSize::new(*width, 500.0)).unwrap();
            }
            pages.pagination_completed(6);
            assert!(pages.is_dynamic_page_sizes());
            pages
        }

        #[test]
        fn pivot_row_width_bounds_neighbor_rows() {
            let pages = varied_pages();
            let mut rows = RowLayoutCache::new(10.0, 10.0, 32);
            let outcome = rows.recalc_rows(1, 2, &pages).unwrap();

            // Pivot row = pages 1,2 -> width 100 + 10 + 100 = 210.
            // Backward: page 0 alone (200 <= 210, no more pages before).
            // Forward: page 3 alone (400 > 210 would not merge with 4),
            // then pages 4,5 (100 + 10 + 100 = 210 <= 210).
            assert_eq!(partition(&rows), vec![(0, 1), (1, 2), (3, 1), (4, 2)]);
            let RowLayoutOutcome::Completed(completed) = outcome else {
                panic!("layout should complete");
            };
            assert_eq!(completed.pivot_row, 1);
        }

        #[test]
        fn backward_rows_tile_to_page_zero() {
            let pages = varied_pages();
            let mut rows = RowLayoutCache::new(10.0, 10.0, 32);
            rows.recalc_rows(4, 2, &pages).unwrap();

            // Pivot row = pages 4,5 (210 wide). Backward from page 3: 400
            // alone; pages 1,2 merge (210); page 0 alone (200).
            assert_eq!(partition(&rows), vec![(0, 1), (1, 2), (3, 1), (4, 2)]);
            assert_eq!(rows.pivot_row(), 3);
            assert_eq!(rows.row(0).unwrap().first_page, 0);
        }

        #[test]
        fn partition_is_contiguous() {
            let pages = varied_pages();
            let mut rows = RowLayoutCache::new(10.0, 10.0, 32);
            rows.recalc_rows(3, 3, &pages).unwrap();

            let mut expected_first = 0;
            for row in rows.rows() {
                assert_eq!(row.first_page, expected_first);
                expected_first = row.end_page();
            }
            assert_eq!(expected_first, 6);
        }
    }

    mod scale_and_spacing {
        use super::*;

        #[test]
        fn rescale_preserves_partition_and_scales_geometry() {
            let pages = uniform_pages(4);
            let mut rows = cache();
            rows.recalc_rows(0, 2, &pages).unwrap();
            let before = partition(&rows);

            rows.recalc_for_scale_or_spacing(2.0, 10.0, 10.0, &pages).unwrap();
            assert_eq!(partition(&rows), before);
            assert_eq!(rows.row(0).unwrap().height, 1056.0 * 2.0 + 10.0);
            assert_eq!(rows.row(0).unwrap().width, 816.0 * 4.0 + 10.0);
        }

        #[test]
        fn recalc_twice_with_same_values_is_identical() {
            let pages = uniform_pages(5);
            let mut rows = cache();
            rows.recalc_rows(0, 2, &pages).unwrap();

            rows.recalc_for_scale_or_spacing(1.5, 8.0, 12.0, &pages).unwrap();
            let first: Vec<RowInfo> = rows.rows().to_vec();
            rows.recalc_for_scale_or_spacing(1.5, 8.0, 12.0, &pages).unwrap();
            assert_eq!(rows.rows(), first.as_slice());
        }

        #[test]
        fn invalid_scale_and_spacing_are_rejected() {
            let pages = uniform_pages(2);
            let mut rows = cache();
            rows.recalc_rows(0, 1, &pages).unwrap();

            assert_eq!(
                rows.recalc_for_scale_or_spacing(0.0, 10.0, 10.0, &pages),
                Err(LayoutError::InvalidScale(0.0))
            );
            assert_eq!(
                rows.recalc_for_scale_or_spacing(1.0, -1.0, 10.0, &pages),
                Err(LayoutError::InvalidSpacing(-1.0))
            );
        }
    }

    mod offset_queries {
        use super::*;

        fn laid_out(count: usize, columns: usize) -> (RowLayoutCache, PageSizeCache) {
            let pages = uniform_pages(count);
            let mut rows = cache();
            rows.recalc_rows(0, columns, &pages).unwrap();
            (rows, pages)
        }

        #[test]
        fn offset_round_trips_to_row_index() {
            let (rows, _) = laid_out(10, 3);
            for index in 0..rows.row_count() {
                let offset = rows.row(index).unwrap().vertical_offset;
                assert_eq!(rows.row_index_for_vertical_offset(offset), index);
            }
        }

        #[test]
        fn offset_inside_a_row_hits_that_row() {
            let (rows, _) = laid_out(6, 2);
            // Row height is 1066; halfway into row 1.
            assert_eq!(rows.row_index_for_vertical_offset(1066.0 + 500.0), 1);
        }

        #[test]
        fn offset_within_epsilon_of_boundary_snaps_to_next_row() {
            let (rows, _) = laid_out(6, 2);
            // 0.4 px of row 0 would remain visible: snap to row 1.
            assert_eq!(rows.row_index_for_vertical_offset(1066.0 - 0.4), 1);
            // 0.6 px still visible: stay on row 0.
            assert_eq!(rows.row_index_for_vertical_offset(1066.0 - 0.6), 0);
        }

        #[test]
        fn last_row_does_not_snap_past_the_end() {
            let (rows, _) = laid_out(2, 2);
            let bottom = rows.row(0).unwrap().bottom();
            assert_eq!(rows.row_index_for_vertical_offset(bottom - 0.1), 0);
        }

        #[test]
        fn offset_past_the_end_clamps_to_last_row() {
            let (rows, _) = laid_out(6, 2);
            assert_eq!(rows.row_index_for_vertical_offset(1.0e9), 2);
        }

        #[test]
        fn visible_range_covers_intersecting_rows_without_gaps() {
            let (rows, _) = laid_out(12, 2);
            // Rows at 0, 1066, 2132, 3198, 4264, 5330; viewport 500..1700.
            let (first, count) = rows.visible_row_range(500.0, 1700.0);
            assert_eq!((first, count), (0, 2));

            for index in 0..rows.row_count() {
                let row = rows.row(index).unwrap();
                let intersects = row.vertical_offset < 1700.0 && row.bottom() > 500.0;
                let included = index >= first && index < first + count;
                assert_eq!(intersects, included, "row {index}");
            }
        }

        #[test]
        fn row_starting_at_end_offset_is_excluded() {
            let (rows, _) = laid_out(8, 2);
            let (first, count) = rows.visible_row_range(0.0, 1066.0);
            assert_eq!((first, count), (0, 1));
        }

        #[test]
        fn empty_cache_answers_zero() {
            let rows = cache();
            assert_eq!(rows.visible_row_range(0.0, 100.0), (0, 0));
            assert_eq!(rows.row_index_for_vertical_offset(50.0), 0);
        }

        #[test]
        fn row_for_page_beyond_cache_is_a_range_error() {
            let (rows, _) = laid_out(4, 2);
            assert_eq!(
                rows.row_for_page(9).unwrap_err(),
                LayoutError::PageOutOfRange {
                    page: 9,
                    page_count: 4
                }
            );
        }
    }

    mod incremental_updates {
        use super::*;
        use crate::model::PageCacheChangeKind;

        fn change(start: usize, count: usize, kind: PageCacheChangeKind) -> PageCacheChange {
            PageCacheChange::new(start, count, kind)
        }

        #[test]
        fn pages_after_last_row_grow_new_rows() {
            let mut pages = PageSizeCache::new(DEFAULT);
            pages.set_source(6);
            let mut rows = cache();
            rows.recalc_rows(0, 3, &pages).unwrap();
            assert_eq!(rows.row_count(), 2);

            let batch = pages.pagination_progress(6, 4);
            let update = rows.apply_page_changes(&batch, &pages).unwrap();

            assert_eq!(partition(&rows), vec![(0, 3), (3, 3), (6, 3), (9, 1)]);
            assert_eq!(update.changes, vec![RowCacheChange::new(2, 2)]);
            assert!(update.completed.is_none());
        }

        #[test]
        fn short_trailing_row_is_refilled_before_growing() {
            let mut pages = PageSizeCache::new(DEFAULT);
            pages.set_source(4);
            let mut rows = cache();
            rows.recalc_rows(0, 3, &pages).unwrap();
            assert_eq!(partition(&rows), vec![(0, 3), (3, 1)]);

            let batch = pages.pagination_progress(4, 4);
            let update = rows.apply_page_changes(&batch, &pages).unwrap();

            assert_eq!(partition(&rows), vec![(0, 3), (3, 3), (6, 2)]);
            assert_eq!(update.changes, vec![RowCacheChange::new(1, 2)]);
        }

        #[test]
        fn height_update_shifts_only_later_rows_by_the_delta() {
            let mut pages = measured_pages(8);
            let mut rows = cache();
            rows.recalc_rows(0, 2, &pages).unwrap();
            let before: Vec<f64> = rows.rows().iter().map(|row| row.vertical_offset).collect();

            // Page 2 grows 100 px taller; its row is row 1.
            let batch = pages
                .page_measured(2, PageSize::new(816.0, 1156.0))
                .unwrap();
            let update = rows.apply_page_changes(&batch, &pages).unwrap();

            let after: Vec<f64> = rows.rows().iter().map(|row| row.vertical_offset).collect();
            assert_eq!(after[0], before[0]);
            assert_eq!(after[1], before[1]);
            for index in 2..after.len() {
                assert_eq!(after[index], before[index] + 100.0);
            }
            // The change spans the recomputed row and everything it shifted.
            assert_eq!(update.changes, vec![RowCacheChange::new(1, 3)]);
        }

        #[test]
        fn extent_height_tracks_the_delta() {
            let mut pages = measured_pages(4);
            let mut rows = cache();
            rows.recalc_rows(0, 2, &pages).unwrap();
            let before = rows.extent().height;

            let batch = pages
                .page_measured(0, PageSize::new(816.0, 1256.0))
                .unwrap();
            rows.apply_page_changes(&batch, &pages).unwrap();
            assert_eq!(rows.extent().height, before + 200.0);
        }

        #[test]
        fn width_shrink_away_from_maximum_rescans_extent() {
            let mut pages = measured_pages(4);
            let mut rows = cache();
            rows.recalc_rows(0, 2, &pages).unwrap();
            assert_eq!(rows.extent().width, 1642.0);

            // Narrow both pages of row 0; row 1 keeps the old maximum.
            pages.page_measured(0, PageSize::new(400.0, 1056.0)).unwrap();
            pages.page_measured(1, PageSize::new(400.0, 1056.0)).unwrap();
            rows.apply_page_changes(&[change(0, 2, PageCacheChangeKind::Update)], &pages)
                .unwrap();

            assert_eq!(rows.extent().width, 1642.0);
        }

        #[test]
        fn remove_trims_rows_past_the_new_page_count() {
            let mut pages = uniform_pages(10);
            let mut rows = cache();
            rows.recalc_rows(0, 3, &pages).unwrap();
            assert_eq!(rows.row_count(), 4);

            let batch = pages.pagination_completed(7);
            let update = rows.apply_page_changes(&batch, &pages).unwrap();

            assert_eq!(partition(&rows), vec![(0, 3), (3, 3), (6, 1)]);
            assert_eq!(rows.covered_page_count(), 7);
            assert!(!update.changes.is_empty());
            assert_eq!(rows.extent().height, 3.0 * 1066.0);
        }

        #[test]
        fn deferred_layout_replays_once_enough_pages_arrive() {
            let mut pages = PageSizeCache::new(DEFAULT);
            pages.set_source(1);
            let mut rows = cache();
            assert_eq!(
                rows.recalc_rows(0, 3, &pages).unwrap(),
                RowLayoutOutcome::Deferred
            );

            let batch = pages.pagination_progress(1, 1);
            let update = rows.apply_page_changes(&batch, &pages).unwrap();
            assert!(update.completed.is_none());
            assert_eq!(rows.row_count(), 0);

            let batch = pages.pagination_progress(2, 2);
            let update = rows.apply_page_changes(&batch, &pages).unwrap();
            let completed = update.completed.unwrap();
            assert_eq!(completed.change, RowCacheChange::new(0, 2));
            assert_eq!(partition(&rows), vec![(0, 3), (3, 1)]);
        }

        #[test]
        fn changes_before_any_layout_are_ignored() {
            let mut pages = PageSizeCache::new(DEFAULT);
            let batch = pages.set_source(5);
            let mut rows = cache();
            let update = rows.apply_page_changes(&batch, &pages).unwrap();
            assert_eq!(update, RowUpdate::default());
        }
    }
}

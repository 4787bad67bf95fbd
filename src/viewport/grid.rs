//! The grid viewport: virtualized realization of visible pages.
//!
//! Owns the [`ViewportState`] exclusively. Scroll offsets and zoom never
//! leak into the caches; the viewport asks the row cache which rows are
//! visible, realizes exactly those pages, and arranges them at computed
//! offsets. View operations queue a coalesced [`LayoutRequest`] processed on
//! the next input-band pump instead of running synchronously.

use crate::config::ViewerConfig;
use crate::layout::page_cache::PageSizeCache;
use crate::layout::row_cache::{RowLayoutCache, RowLayoutOutcome};
use crate::model::{Extent, LayoutError, RowCacheChange};
use crate::scheduler::{Priority, ScheduledTask, TaskQueue};
use crate::viewport::state::{LayoutRequest, ViewMode, ViewportState};
use crate::viewport::visual::{VisualDiff, VisualTree};

/// Smallest scale a layout request may produce.
const MIN_SCALE: f64 = 0.1;
/// Largest scale a layout request may produce.
const MAX_SCALE: f64 = 16.0;
/// Scale assumed for the smallest useful thumbnail when bounding the
/// column-count search.
const MIN_THUMBNAIL_SCALE: f64 = 0.1;

/// What a processed layout request did to the row cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessedLayout {
    /// Offsets changed only; row recalculation bypassed.
    OffsetOnly,
    /// Row geometry re-derived for a new scale, partition preserved.
    Rescaled(RowCacheChange),
    /// Full row rebuild ran (or deferred until enough pages exist).
    Recalculated(RowLayoutOutcome),
}

/// Virtualizes the visible slice of the row layout into page visuals.
#[derive(Debug)]
pub struct GridViewport {
    state: ViewportState,
    rtl: bool,
    visuals: VisualTree,
    pending_request: Option<LayoutRequest>,
    pending_make_visible: Option<usize>,
    scroll_info_dirty: bool,
    first_visible_page: usize,
    /// Column count restored when leaving thumbnail view.
    saved_columns: usize,
    horizontal_spacing: f64,
    vertical_spacing: f64,
    max_pages_across: usize,
    line_scroll: f64,
    wheel_scroll: f64,
}

impl GridViewport {
    /// Create a viewport with the configured spacing and scroll deltas.
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            state: ViewportState::default(),
            rtl: false,
            visuals: VisualTree::new(),
            pending_request: None,
            pending_make_visible: None,
            scroll_info_dirty: false,
            first_visible_page: 0,
            saved_columns: 1,
            horizontal_spacing: config.horizontal_spacing,
            vertical_spacing: config.vertical_spacing,
            max_pages_across: config.max_pages_across,
            line_scroll: config.line_scroll_amount,
            wheel_scroll: config.wheel_scroll_amount,
        }
    }

    /// Current viewport state (scroll-info contract).
    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    /// First page of the realized visible set.
    pub fn first_visible_page_number(&self) -> usize {
        self.first_visible_page
    }

    /// Realized page visuals, in page order.
    pub fn visuals(&self) -> &VisualTree {
        &self.visuals
    }

    /// Upper bound on pages per row.
    pub fn max_pages_across(&self) -> usize {
        self.max_pages_across
    }

    /// Mirror the X origin for right-to-left flow.
    pub fn set_rtl(&mut self, rtl: bool) {
        self.rtl = rtl;
    }

    /// True when arranging right-to-left.
    pub fn is_rtl(&self) -> bool {
        self.rtl
    }

    /// True when offsets/extent changed since the scroll host last asked.
    pub fn is_scroll_info_dirty(&self) -> bool {
        self.scroll_info_dirty
    }

    /// Read-and-clear the scroll-info-dirty flag.
    pub fn take_scroll_info_dirty(&mut self) -> bool {
        std::mem::take(&mut self.scroll_info_dirty)
    }

    /// The still-pending layout request, if any.
    pub fn pending_request(&self) -> Option<LayoutRequest> {
        self.pending_request
    }

    /// The make-visible target waiting for pagination, if any.
    pub fn pending_make_visible(&self) -> Option<usize> {
        self.pending_make_visible
    }

    /// Mark a realized page's content dirty (render-only invalidation).
    pub fn mark_page_dirty(&mut self, page_number: usize) -> bool {
        self.visuals.mark_page_dirty(page_number)
    }

    // === Measure / arrange ===

    /// Recompute the visible row set and sync the realized visuals to it.
    ///
    /// Only the entering/leaving pages are created/destroyed; an unchanged
    /// visible range reuses every visual.
    pub fn measure(&mut self, width: f64, height: f64, rows: &RowLayoutCache) -> VisualDiff {
        self.state.viewport_width = width;
        self.state.viewport_height = height;

        let top = self.state.vertical_offset;
        let (first_row, row_count) = rows.visible_row_range(top, top + height);
        if row_count == 0 {
            let removed = self.visuals.clear();
            self.first_visible_page = 0;
            return VisualDiff {
                removed,
                ..VisualDiff::default()
            };
        }

        let first_page = rows.rows()[first_row].first_page;
        let end_page = rows.rows()[first_row + row_count - 1].end_page();
        let diff = self.visuals.sync(first_page, end_page - first_page);
        self.first_visible_page = first_page;
        tracing::trace!(
            first_page,
            pages = end_page - first_page,
            created = diff.created,
            removed = diff.removed,
            "measured visible set"
        );
        diff
    }

    /// Position every realized visual at its row offset.
    ///
    /// Rows are centered within the content width; X advances by the scaled
    /// page width plus spacing, mirrored from the right edge in RTL flow.
    pub fn arrange(&mut self, rows: &RowLayoutCache, pages: &PageSizeCache) {
        let extent = rows.extent();
        let content_width = extent.width.max(self.state.viewport_width);
        let scale = rows.scale();
        let total = self.visuals.len();

        let mut index = 0;
        while index < total {
            let page = self.visuals.visuals()[index].page_number;
            let Ok(row) = rows.row_for_page(page).copied() else {
                index += 1;
                continue;
            };
            let row_origin_x =
                (content_width - row.width) / 2.0 - self.state.horizontal_offset;
            let row_y = row.vertical_offset - self.state.vertical_offset;

            let mut running_x = 0.0;
            for page_in_row in row.first_page..row.end_page() {
                let size = pages.page_size(page_in_row).scaled(scale);
                if index < total
                    && self.visuals.visuals()[index].page_number == page_in_row
                {
                    let x = if self.rtl {
                        row_origin_x + row.width - running_x - size.width
                    } else {
                        row_origin_x + running_x
                    };
                    self.visuals.place(index, x, row_y, size);
                    index += 1;
                }
                running_x += size.width + self.horizontal_spacing;
            }
        }
    }

    // === Scroll primitives ===

    /// Scroll one line up.
    pub fn line_up(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(0.0, -self.line_scroll, rows);
    }

    /// Scroll one line down.
    pub fn line_down(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(0.0, self.line_scroll, rows);
    }

    /// Scroll one line left.
    pub fn line_left(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(-self.line_scroll, 0.0, rows);
    }

    /// Scroll one line right.
    pub fn line_right(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(self.line_scroll, 0.0, rows);
    }

    /// Scroll one viewport height up.
    pub fn page_up(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(0.0, -self.state.viewport_height, rows);
    }

    /// Scroll one viewport height down.
    pub fn page_down(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(0.0, self.state.viewport_height, rows);
    }

    /// Scroll one viewport width left.
    pub fn page_left(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(-self.state.viewport_width, 0.0, rows);
    }

    /// Scroll one viewport width right.
    pub fn page_right(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(self.state.viewport_width, 0.0, rows);
    }

    /// Scroll one wheel notch up.
    pub fn wheel_up(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(0.0, -self.wheel_scroll, rows);
    }

    /// Scroll one wheel notch down.
    pub fn wheel_down(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(0.0, self.wheel_scroll, rows);
    }

    /// Scroll one wheel notch left.
    pub fn wheel_left(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(-self.wheel_scroll, 0.0, rows);
    }

    /// Scroll one wheel notch right.
    pub fn wheel_right(&mut self, rows: &RowLayoutCache) {
        self.scroll_by(self.wheel_scroll, 0.0, rows);
    }

    fn scroll_by(&mut self, dx: f64, dy: f64, rows: &RowLayoutCache) {
        self.state.horizontal_offset += dx;
        self.state.vertical_offset += dy;
        self.clamp_offsets(rows.extent());
        self.scroll_info_dirty = true;
    }

    fn clamp_offsets(&mut self, extent: Extent) {
        let max_h = (extent.width - self.state.viewport_width).max(0.0);
        let max_v = (extent.height - self.state.viewport_height).max(0.0);
        self.state.horizontal_offset = self.state.horizontal_offset.clamp(0.0, max_h);
        self.state.vertical_offset = self.state.vertical_offset.clamp(0.0, max_v);
    }

    // === Queued layout requests ===

    /// Queue a document-layout request for the next input-band pump.
    ///
    /// A pending request is replaced, not queued twice: rapid repeated view
    /// operations coalesce into the last one.
    pub fn request_layout(&mut self, request: LayoutRequest, queue: &mut TaskQueue) {
        if let Some(previous) = self.pending_request.replace(request) {
            tracing::debug!(?previous, current = ?request, "pending layout request replaced");
        }
        queue.schedule(Priority::Input, ScheduledTask::ProcessLayoutRequest);
    }

    /// Queue an explicit zoom.
    pub fn set_scale(&mut self, scale: f64, queue: &mut TaskQueue) {
        self.request_layout(LayoutRequest::Zoom(scale), queue);
    }

    /// Queue a column-count change at the current scale.
    pub fn set_columns(&mut self, columns: usize, queue: &mut TaskQueue) {
        self.request_layout(LayoutRequest::SetColumns(columns), queue);
    }

    /// Queue a fit of `columns` columns to the viewport width.
    pub fn fit_columns(&mut self, columns: usize, queue: &mut TaskQueue) {
        self.request_layout(LayoutRequest::FitColumns(columns), queue);
    }

    /// Queue a fit of one page to the viewport width.
    pub fn fit_to_page_width(&mut self, queue: &mut TaskQueue) {
        self.request_layout(LayoutRequest::FitToPageWidth, queue);
    }

    /// Queue a fit of one page to the viewport height.
    pub fn fit_to_page_height(&mut self, queue: &mut TaskQueue) {
        self.request_layout(LayoutRequest::FitToPageHeight, queue);
    }

    /// Queue a switch to the thumbnail grid.
    pub fn view_thumbnails(&mut self, queue: &mut TaskQueue) {
        self.request_layout(LayoutRequest::Thumbnails, queue);
    }

    /// Queue a horizontal-offset change (no row recalculation).
    pub fn set_horizontal_offset(&mut self, offset: f64, queue: &mut TaskQueue) {
        self.request_layout(LayoutRequest::SetHorizontalOffset(offset), queue);
    }

    /// Queue a vertical-offset change (no row recalculation).
    pub fn set_vertical_offset(&mut self, offset: f64, queue: &mut TaskQueue) {
        self.request_layout(LayoutRequest::SetVerticalOffset(offset), queue);
    }

    /// Apply the pending layout request, if any.
    ///
    /// Offset-only requests skip row recalculation; scale-only requests
    /// re-derive row geometry in place; everything else rebuilds the row
    /// partition around the first visible page.
    pub fn process_pending_request(
        &mut self,
        rows: &mut RowLayoutCache,
        pages: &PageSizeCache,
    ) -> Result<Option<ProcessedLayout>, LayoutError> {
        let Some(request) = self.pending_request.take() else {
            return Ok(None);
        };

        if request.is_offset_only() {
            match request {
                LayoutRequest::SetHorizontalOffset(offset) => {
                    self.state.horizontal_offset = offset;
                }
                LayoutRequest::SetVerticalOffset(offset) => {
                    self.state.vertical_offset = offset;
                }
                _ => {}
            }
            self.state.view_mode = request.view_mode();
            self.clamp_offsets(rows.extent());
            self.scroll_info_dirty = true;
            return Ok(Some(ProcessedLayout::OffsetOnly));
        }

        let leaving_thumbnails = self.state.view_mode == ViewMode::Thumbnails
            && request.view_mode() != ViewMode::Thumbnails;
        if leaving_thumbnails {
            self.state.columns = self.saved_columns;
        }

        let processed = match request {
            LayoutRequest::SetColumns(columns) => {
                if columns == 0 {
                    return Err(LayoutError::InvalidColumnCount(columns));
                }
                self.state.columns = columns;
                self.saved_columns = columns;
                let outcome = rows.recalc_rows(self.first_visible_page, columns, pages)?;
                ProcessedLayout::Recalculated(outcome)
            }
            LayoutRequest::FitColumns(columns) => {
                if columns == 0 {
                    return Err(LayoutError::InvalidColumnCount(columns));
                }
                self.state.columns = columns;
                self.saved_columns = columns;
                let scale = self.scale_to_fit_columns(columns, pages);
                self.apply_scale(scale, rows, pages)?;
                let outcome = rows.recalc_rows(self.first_visible_page, columns, pages)?;
                ProcessedLayout::Recalculated(outcome)
            }
            LayoutRequest::FitToPageWidth => {
                self.state.columns = 1;
                self.saved_columns = 1;
                let scale = self.scale_to_fit_page(pages, true);
                self.apply_scale(scale, rows, pages)?;
                let outcome = rows.recalc_rows(self.first_visible_page, 1, pages)?;
                ProcessedLayout::Recalculated(outcome)
            }
            LayoutRequest::FitToPageHeight => {
                self.state.columns = 1;
                self.saved_columns = 1;
                let scale = self.scale_to_fit_page(pages, false);
                self.apply_scale(scale, rows, pages)?;
                let outcome = rows.recalc_rows(self.first_visible_page, 1, pages)?;
                ProcessedLayout::Recalculated(outcome)
            }
            LayoutRequest::Thumbnails => {
                let columns = self.thumbnail_columns(pages);
                self.state.columns = columns;
                let scale = self.scale_to_fit_columns(columns, pages);
                self.apply_scale(scale, rows, pages)?;
                let outcome = rows.recalc_rows(self.first_visible_page, columns, pages)?;
                ProcessedLayout::Recalculated(outcome)
            }
            LayoutRequest::Zoom(scale) => {
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(LayoutError::InvalidScale(scale));
                }
                let change = self.apply_scale(scale.clamp(MIN_SCALE, MAX_SCALE), rows, pages)?;
                if leaving_thumbnails {
                    // The thumbnail partition is gone with the mode; rebuild
                    // with the restored column count.
                    let outcome =
                        rows.recalc_rows(self.first_visible_page, self.state.columns, pages)?;
                    ProcessedLayout::Recalculated(outcome)
                } else {
                    ProcessedLayout::Rescaled(change)
                }
            }
            LayoutRequest::SetHorizontalOffset(_) | LayoutRequest::SetVerticalOffset(_) => {
                // Handled by the offset-only path above.
                return Ok(None);
            }
        };

        self.state.view_mode = request.view_mode();
        self.clamp_offsets(rows.extent());
        self.scroll_info_dirty = true;
        Ok(Some(processed))
    }

    fn apply_scale(
        &mut self,
        scale: f64,
        rows: &mut RowLayoutCache,
        pages: &PageSizeCache,
    ) -> Result<RowCacheChange, LayoutError> {
        self.state.scale = scale;
        rows.recalc_for_scale_or_spacing(
            scale,
            self.horizontal_spacing,
            self.vertical_spacing,
            pages,
        )
    }

    fn scale_to_fit_columns(&self, columns: usize, pages: &PageSizeCache) -> f64 {
        let page_width = self.representative_page(pages).width;
        let columns_f = columns as f64;
        let available =
            (self.state.viewport_width - (columns_f - 1.0) * self.horizontal_spacing).max(1.0);
        (available / (columns_f * page_width)).clamp(MIN_SCALE, MAX_SCALE)
    }

    fn scale_to_fit_page(&self, pages: &PageSizeCache, fit_width: bool) -> f64 {
        let page = self.representative_page(pages);
        let scale = if fit_width {
            self.state.viewport_width.max(1.0) / page.width
        } else {
            (self.state.viewport_height - self.vertical_spacing).max(1.0) / page.height
        };
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }

    fn representative_page(&self, pages: &PageSizeCache) -> crate::model::PageSize {
        let size = pages.page_size(self.first_visible_page);
        if size.is_degenerate() {
            pages.default_page_size()
        } else {
            size
        }
    }

    /// Thumbnail column count: the candidate in `[1, max]` whose grid
    /// aspect ratio is closest to the viewport's.
    ///
    /// Candidates are bounded by how many minimally-scaled pages fit the
    /// viewport width, by `max_pages_across`, and by the page count.
    fn thumbnail_columns(&self, pages: &PageSizeCache) -> usize {
        let total = pages.page_count();
        if total == 0 {
            return 1;
        }
        let page = pages.default_page_size();
        let viewport_width = self.state.viewport_width.max(1.0);
        let viewport_height = self.state.viewport_height.max(1.0);
        let viewport_aspect = viewport_width / viewport_height;

        let min_width = page.width * MIN_THUMBNAIL_SCALE;
        let fit = ((viewport_width + self.horizontal_spacing)
            / (min_width + self.horizontal_spacing))
            .floor() as usize;
        let max_candidates = fit.clamp(1, self.max_pages_across.min(total));

        let mut best = 1;
        let mut best_error = f64::INFINITY;
        for columns in 1..=max_candidates {
            let row_count = total.div_ceil(columns);
            let grid_width = columns as f64 * page.width
                + (columns as f64 - 1.0) * self.horizontal_spacing;
            let grid_height = row_count as f64 * (page.height + self.vertical_spacing);
            let error = (grid_width / grid_height - viewport_aspect).abs();
            if error < best_error {
                best = columns;
                best_error = error;
            }
        }
        best
    }

    // === Make-visible ===

    /// Scroll so `page_number` is at the top of the viewport.
    ///
    /// When the row cache does not cover the page yet (pagination still
    /// running), the request is stored and replayed once layout completes.
    /// Returns true when applied immediately.
    pub fn make_page_visible(&mut self, page_number: usize, rows: &RowLayoutCache) -> bool {
        match rows.row_for_page(page_number) {
            Ok(row) => {
                self.state.vertical_offset = row.vertical_offset;
                self.pending_make_visible = None;
                self.clamp_offsets(rows.extent());
                self.scroll_info_dirty = true;
                true
            }
            Err(_) => {
                tracing::debug!(page_number, "make-visible stored until layout covers the page");
                self.pending_make_visible = Some(page_number);
                false
            }
        }
    }

    /// React to a completed row layout: clamp offsets to the new extent and
    /// replay a stored make-visible request.
    pub fn on_row_layout_completed(&mut self, rows: &RowLayoutCache) {
        self.clamp_offsets(rows.extent());
        self.scroll_info_dirty = true;
        if let Some(page) = self.pending_make_visible {
            if rows.contains_page(page) {
                self.make_page_visible(page, rows);
            }
        }
    }
}

//! Wires the caches, bridge, viewport and task queue into one document view.
//!
//! Change notifications flow bottom-up (bridge events -> page cache -> row
//! cache -> viewport) and layout requests flow top-down. The hosting viewer
//! drives everything by pumping the queue: one [`DocumentView::pump`] call
//! pops one task (input before background before idle) and returns a
//! [`PumpReport`] describing what changed.

use std::time::Duration;

use crate::config::ViewerConfig;
use crate::layout::page_cache::PageSizeCache;
use crate::layout::row_cache::{RowLayoutCache, RowLayoutCompleted, RowLayoutOutcome};
use crate::model::{PageCacheChange, RowCacheChange, ViewerError};
use crate::paginate::bridge::{AsyncPageOutcome, PageCompletion, PaginationBridge};
use crate::paginate::formatter::{ContentPosition, PageFormatter, PaginationEvent};
use crate::scheduler::{Priority, ScheduledTask, TaskQueue};
use crate::viewport::grid::{GridViewport, ProcessedLayout};
use crate::viewport::visual::VisualDiff;

/// What one pump accomplished.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PumpReport {
    /// The task that ran; `None` when the queue was idle.
    pub task: Option<ScheduledTask>,
    /// Page-cache change batches delivered during this pump.
    pub page_changes: Vec<PageCacheChange>,
    /// Row-cache changes produced during this pump.
    pub row_changes: Vec<RowCacheChange>,
    /// Present when a full row layout completed during this pump.
    pub layout_completed: Option<RowLayoutCompleted>,
    /// Async page requests resolved during this pump.
    pub completions: Vec<PageCompletion>,
    /// Visual churn when this pump realized visuals.
    pub visual_diff: Option<VisualDiff>,
}

impl PumpReport {
    /// True when the queue had nothing to do.
    pub fn is_idle(&self) -> bool {
        self.task.is_none()
    }
}

/// The assembled layout pipeline for one document.
#[derive(Debug)]
pub struct DocumentView<F> {
    bridge: PaginationBridge<F>,
    pages: PageSizeCache,
    rows: RowLayoutCache,
    viewport: GridViewport,
    queue: TaskQueue,
}

impl<F: PageFormatter> DocumentView<F> {
    /// Assemble the pipeline around `formatter`.
    ///
    /// Seeds the page cache from the formatter's page-count hint and
    /// schedules the first background pagination tick.
    pub fn new(formatter: F, config: ViewerConfig) -> Self {
        let bridge = PaginationBridge::with_slice_budget(
            formatter,
            Duration::from_millis(config.pagination_slice_ms),
        );
        let mut pages = PageSizeCache::new(config.default_page_size);
        let rows = RowLayoutCache::new(
            config.horizontal_spacing,
            config.vertical_spacing,
            config.max_pages_across,
        );
        let viewport = GridViewport::new(&config);
        let mut queue = TaskQueue::new();

        let hint = bridge.page_count_hint().unwrap_or(0);
        // No row layout exists yet, so the seed batch has no listener.
        let _ = pages.set_source(hint);
        queue.schedule(Priority::Background, ScheduledTask::PaginationTick);

        Self {
            bridge,
            pages,
            rows,
            viewport,
            queue,
        }
    }

    // === Pumping ===

    /// Pop and run one task. Idle pumps return an empty report.
    pub fn pump(&mut self) -> Result<PumpReport, ViewerError> {
        let Some(task) = self.queue.pop() else {
            return Ok(PumpReport::default());
        };
        let mut report = PumpReport {
            task: Some(task),
            ..PumpReport::default()
        };

        match task {
            ScheduledTask::ProcessLayoutRequest => self.run_layout_request(&mut report)?,
            ScheduledTask::PaginationTick => self.run_pagination_tick(&mut report)?,
            ScheduledTask::RealizeVisuals => {
                let width = self.viewport.state().viewport_width;
                let height = self.viewport.state().viewport_height;
                let diff = self.viewport.measure(width, height, &self.rows);
                self.viewport.arrange(&self.rows, &self.pages);
                report.visual_diff = Some(diff);
            }
        }
        Ok(report)
    }

    /// Pump until the queue drains or `max_pumps` is reached.
    pub fn run_until_idle(&mut self, max_pumps: usize) -> Result<Vec<PumpReport>, ViewerError> {
        let mut reports = Vec::new();
        for _ in 0..max_pumps {
            if self.queue.is_empty() {
                break;
            }
            reports.push(self.pump()?);
        }
        Ok(reports)
    }

    fn run_layout_request(&mut self, report: &mut PumpReport) -> Result<(), ViewerError> {
        let Some(processed) = self
            .viewport
            .process_pending_request(&mut self.rows, &self.pages)?
        else {
            return Ok(());
        };
        match processed {
            ProcessedLayout::OffsetOnly => {}
            ProcessedLayout::Rescaled(change) => {
                report.row_changes.push(change);
                self.viewport.on_row_layout_completed(&self.rows);
            }
            ProcessedLayout::Recalculated(RowLayoutOutcome::Completed(completed)) => {
                report.row_changes.push(completed.change);
                report.layout_completed = Some(completed);
                self.viewport.on_row_layout_completed(&self.rows);
            }
            ProcessedLayout::Recalculated(RowLayoutOutcome::Deferred) => {}
        }
        self.queue
            .schedule(Priority::Idle, ScheduledTask::RealizeVisuals);
        Ok(())
    }

    fn run_pagination_tick(&mut self, report: &mut PumpReport) -> Result<(), ViewerError> {
        let tick = self.bridge.background_tick()?;
        report.completions = tick.completions;

        for event in tick.events {
            let batch = match event {
                PaginationEvent::Progress { start, count } => {
                    self.pages.pagination_progress(start, count)
                }
                PaginationEvent::PageMeasured { page_number, size } => {
                    self.pages.page_measured(page_number, size)?
                }
                PaginationEvent::Completed { page_count } => {
                    self.pages.pagination_completed(page_count)
                }
            };
            if batch.is_empty() {
                continue;
            }
            let update = self.rows.apply_page_changes(&batch, &self.pages)?;
            report.page_changes.extend(batch);
            report.row_changes.extend(update.changes);
            if update.completed.is_some() {
                report.layout_completed = update.completed;
            }
        }

        if !report.row_changes.is_empty() || report.layout_completed.is_some() {
            self.viewport.on_row_layout_completed(&self.rows);
            self.queue
                .schedule(Priority::Idle, ScheduledTask::RealizeVisuals);
        }
        if tick.more_work {
            self.queue
                .schedule(Priority::Background, ScheduledTask::PaginationTick);
        }
        Ok(())
    }

    // === Measure / arrange (host-driven) ===

    /// Measure the viewport against the row cache at the given constraint.
    pub fn measure(&mut self, width: f64, height: f64) -> VisualDiff {
        self.viewport.measure(width, height, &self.rows)
    }

    /// Arrange realized visuals at their computed offsets.
    pub fn arrange(&mut self) {
        self.viewport.arrange(&self.rows, &self.pages);
    }

    // === View operations (queued) ===

    /// Queue an explicit zoom.
    pub fn set_scale(&mut self, scale: f64) {
        self.viewport.set_scale(scale, &mut self.queue);
    }

    /// Queue a column-count change.
    pub fn set_columns(&mut self, columns: usize) {
        self.viewport.set_columns(columns, &mut self.queue);
    }

    /// Queue a fit of `columns` columns to the viewport width.
    pub fn fit_columns(&mut self, columns: usize) {
        self.viewport.fit_columns(columns, &mut self.queue);
    }

    /// Queue a fit of one page to the viewport width.
    pub fn fit_to_page_width(&mut self) {
        self.viewport.fit_to_page_width(&mut self.queue);
    }

    /// Queue a fit of one page to the viewport height.
    pub fn fit_to_page_height(&mut self) {
        self.viewport.fit_to_page_height(&mut self.queue);
    }

    /// Queue a switch to the thumbnail grid.
    pub fn view_thumbnails(&mut self) {
        self.viewport.view_thumbnails(&mut self.queue);
    }

    /// Queue a horizontal-offset change.
    pub fn set_horizontal_offset(&mut self, offset: f64) {
        self.viewport.set_horizontal_offset(offset, &mut self.queue);
    }

    /// Queue a vertical-offset change.
    pub fn set_vertical_offset(&mut self, offset: f64) {
        self.viewport.set_vertical_offset(offset, &mut self.queue);
    }

    /// Scroll so `page_number` is at the top of the viewport, now or once
    /// layout covers it.
    pub fn make_page_visible(&mut self, page_number: usize) -> bool {
        self.viewport.make_page_visible(page_number, &self.rows)
    }

    // === Scroll primitives (immediate) ===

    /// Scroll one line up.
    pub fn line_up(&mut self) {
        self.viewport.line_up(&self.rows);
    }

    /// Scroll one line down.
    pub fn line_down(&mut self) {
        self.viewport.line_down(&self.rows);
    }

    /// Scroll one line left.
    pub fn line_left(&mut self) {
        self.viewport.line_left(&self.rows);
    }

    /// Scroll one line right.
    pub fn line_right(&mut self) {
        self.viewport.line_right(&self.rows);
    }

    /// Scroll one viewport height up.
    pub fn page_up(&mut self) {
        self.viewport.page_up(&self.rows);
    }

    /// Scroll one viewport height down.
    pub fn page_down(&mut self) {
        self.viewport.page_down(&self.rows);
    }

    /// Scroll one viewport width left.
    pub fn page_left(&mut self) {
        self.viewport.page_left(&self.rows);
    }

    /// Scroll one viewport width right.
    pub fn page_right(&mut self) {
        self.viewport.page_right(&self.rows);
    }

    /// Scroll one wheel notch up.
    pub fn wheel_up(&mut self) {
        self.viewport.wheel_up(&self.rows);
    }

    /// Scroll one wheel notch down.
    pub fn wheel_down(&mut self) {
        self.viewport.wheel_down(&self.rows);
    }

    /// Scroll one wheel notch left.
    pub fn wheel_left(&mut self) {
        self.viewport.wheel_left(&self.rows);
    }

    /// Scroll one wheel notch right.
    pub fn wheel_right(&mut self) {
        self.viewport.wheel_right(&self.rows);
    }

    // === Page access ===

    /// Get a page now, pumping synchronous pagination as needed.
    pub fn get_page_sync(
        &mut self,
        page_number: usize,
    ) -> Result<Option<crate::model::PageSize>, ViewerError> {
        Ok(self.bridge.get_page_sync(page_number)?)
    }

    /// Get a page later; queued requests schedule a background tick.
    pub fn get_page_async(&mut self, page_number: usize) -> Result<AsyncPageOutcome, ViewerError> {
        let outcome = self.bridge.get_page_async(page_number)?;
        if matches!(outcome, AsyncPageOutcome::Queued(_)) {
            self.queue
                .schedule(Priority::Background, ScheduledTask::PaginationTick);
        }
        Ok(outcome)
    }

    /// Cancel a queued async page request.
    pub fn cancel_page_request(&mut self, token: crate::paginate::bridge::RequestToken) -> bool {
        self.bridge.cancel(token)
    }

    // === Invalidation ===

    /// Content changed at `pos`: discard break records from the containing
    /// page onward, mark the affected range dirty, restart pagination.
    pub fn invalidate_content_from(&mut self, pos: ContentPosition) -> Result<(), ViewerError> {
        let prior = self.pages.page_count();
        let first_affected = self.bridge.invalidate_content_from(pos);
        if first_affected < prior {
            let batch = self
                .pages
                .pagination_progress(first_affected, prior - first_affected);
            let update = self.rows.apply_page_changes(&batch, &self.pages)?;
            if !update.changes.is_empty() || update.completed.is_some() {
                self.viewport.on_row_layout_completed(&self.rows);
                self.queue
                    .schedule(Priority::Idle, ScheduledTask::RealizeVisuals);
            }
            let realized: Vec<usize> = self
                .viewport
                .visuals()
                .visuals()
                .iter()
                .map(|visual| visual.page_number)
                .filter(|page| *page >= first_affected)
                .collect();
            for page in realized {
                self.viewport.mark_page_dirty(page);
            }
        }
        self.queue
            .schedule(Priority::Background, ScheduledTask::PaginationTick);
        Ok(())
    }

    /// Render-only change: leave break records intact, mark the page's
    /// visual dirty.
    pub fn invalidate_render(&mut self, page_number: usize) -> bool {
        self.viewport.mark_page_dirty(page_number)
    }

    // === Scroll-info surface ===

    /// Widest row, in pixels.
    pub fn extent_width(&self) -> f64 {
        self.rows.extent().width
    }

    /// Total height of all rows, in pixels.
    pub fn extent_height(&self) -> f64 {
        self.rows.extent().height
    }

    /// Viewport width from the last measure.
    pub fn viewport_width(&self) -> f64 {
        self.viewport.state().viewport_width
    }

    /// Viewport height from the last measure.
    pub fn viewport_height(&self) -> f64 {
        self.viewport.state().viewport_height
    }

    /// Current horizontal scroll offset.
    pub fn horizontal_offset(&self) -> f64 {
        self.viewport.state().horizontal_offset
    }

    /// Current vertical scroll offset.
    pub fn vertical_offset(&self) -> f64 {
        self.viewport.state().vertical_offset
    }

    /// Current scale factor.
    pub fn scale(&self) -> f64 {
        self.viewport.state().scale
    }

    /// Number of pages known to the page cache.
    pub fn page_count(&self) -> usize {
        self.pages.page_count()
    }

    /// First page of the realized visible set.
    pub fn first_visible_page_number(&self) -> usize {
        self.viewport.first_visible_page_number()
    }

    /// Upper bound on pages per row.
    pub fn max_pages_across(&self) -> usize {
        self.viewport.max_pages_across()
    }

    // === Component access ===

    /// The page-size cache.
    pub fn page_cache(&self) -> &PageSizeCache {
        &self.pages
    }

    /// The row layout cache.
    pub fn row_cache(&self) -> &RowLayoutCache {
        &self.rows
    }

    /// The grid viewport.
    pub fn viewport(&self) -> &GridViewport {
        &self.viewport
    }

    /// The pagination bridge.
    pub fn bridge(&self) -> &PaginationBridge<F> {
        &self.bridge
    }

    /// Number of pending scheduled tasks.
    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }
}

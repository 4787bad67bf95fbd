//! End-to-end pagination pipeline tests: formatter -> bridge -> caches ->
//! viewport, driven by pumping the cooperative task queue.

use std::time::Duration;

use pagegrid::config::ViewerConfig;
use pagegrid::integration::DocumentView;
use pagegrid::model::{PageSize, PaginationError};
use pagegrid::paginate::{
    AsyncPageOutcome, ContentPosition, FormattedPage, PageFormatter, PaginationBridge,
};
use pagegrid::scheduler::ScheduledTask;

const LETTER: PageSize = PageSize {
    width: 816.0,
    height: 1056.0,
};

/// Formatter over a fixed list of page sizes; page i's break record is
/// content position i.
struct ScriptedFormatter {
    sizes: Vec<PageSize>,
    hint: Option<usize>,
}

impl ScriptedFormatter {
    fn uniform(count: usize) -> Self {
        Self {
            sizes: vec![LETTER; count],
            hint: None,
        }
    }
}

impl PageFormatter for ScriptedFormatter {
    fn page_count_hint(&self) -> Option<usize> {
        self.hint
    }

    fn format_page(&mut self, start: ContentPosition) -> Option<FormattedPage> {
        let index = start.get();
        let size = *self.sizes.get(index)?;
        let next = if index + 1 < self.sizes.len() {
            Some(ContentPosition::new(index + 1))
        } else {
            None
        };
        Some(FormattedPage { size, next })
    }
}

fn view(count: usize) -> DocumentView<ScriptedFormatter> {
    DocumentView::new(ScriptedFormatter::uniform(count), ViewerConfig::default())
}

#[test]
fn pagination_streams_into_rows_and_visuals() {
    let mut document = view(12);
    document.measure(2500.0, 2000.0);
    document.set_columns(3);
    document.run_until_idle(32).unwrap();

    assert_eq!(document.page_count(), 12);
    assert_eq!(document.row_cache().row_count(), 4);
    assert_eq!(document.extent_width(), 3.0 * 816.0 + 2.0 * 10.0);
    assert_eq!(document.first_visible_page_number(), 0);
    assert!(!document.viewport().visuals().is_empty());
}

#[test]
fn queued_requests_complete_in_fifo_arrival_order() {
    let mut document = view(10);
    let AsyncPageOutcome::Queued(late) = document.get_page_async(7).unwrap() else {
        panic!("expected queued request");
    };
    let AsyncPageOutcome::Queued(early) = document.get_page_async(2).unwrap() else {
        panic!("expected queued request");
    };

    let reports = document.run_until_idle(32).unwrap();
    let order: Vec<_> = reports
        .iter()
        .flat_map(|report| report.completions.iter())
        .map(|completion| completion.token)
        .collect();
    assert_eq!(order, vec![late, early]);
}

#[test]
fn missing_page_is_a_sentinel_not_an_error() {
    let mut document = view(3);
    assert_eq!(document.get_page_sync(99).unwrap(), None);
    assert_eq!(document.get_page_sync(1).unwrap(), Some(LETTER));
}

#[test]
fn time_sliced_ticks_requeue_until_pagination_finishes() {
    let config = ViewerConfig {
        // A zero-width slice forces one yield per tick.
        pagination_slice_ms: 0,
        ..ViewerConfig::default()
    };
    let mut document = DocumentView::new(ScriptedFormatter::uniform(40), config);

    let first = document.pump().unwrap();
    assert_eq!(first.task, Some(ScheduledTask::PaginationTick));
    assert!(document.page_count() < 40);
    assert!(document.pending_tasks() > 0, "tick must requeue itself");
}

#[test]
fn make_visible_replays_after_pagination_reaches_the_page() {
    let mut document = view(20);
    document.measure(1800.0, 1200.0);
    document.set_columns(2);

    // Nothing is paginated yet: the request must be stored.
    assert!(!document.make_page_visible(15));
    document.run_until_idle(32).unwrap();

    let expected = document.row_cache().row_for_page(15).unwrap().vertical_offset;
    let max_offset = document.extent_height() - document.viewport_height();
    assert_eq!(
        document.vertical_offset(),
        expected.min(max_offset),
        "stored make-visible must replay once layout covers page 15"
    );
}

#[test]
fn content_invalidation_restarts_only_the_tail() {
    let mut document = view(10);
    document.measure(2000.0, 8000.0);
    document.set_columns(2);
    document.run_until_idle(32).unwrap();
    assert_eq!(document.page_count(), 10);

    document
        .invalidate_content_from(ContentPosition::new(6))
        .unwrap();

    // Break records before the invalidation point survive; the tail is
    // discarded and its cache entries fall back to dirty estimates.
    assert_eq!(document.bridge().page_count(), 6);
    assert_eq!(
        document.bridge().break_record(5),
        Some(ContentPosition::new(5))
    );
    assert_eq!(document.bridge().break_record(6), None);
    assert!(document.page_cache().is_dirty(7));

    document.run_until_idle(32).unwrap();
    assert_eq!(document.page_count(), 10);
    assert!(document.bridge().is_pagination_complete());
    assert!(!document.page_cache().is_dirty(7));
}

#[test]
fn degenerate_measurement_is_a_fatal_contract_violation() {
    let mut document = DocumentView::new(
        ScriptedFormatter {
            sizes: vec![LETTER, PageSize::ZERO, LETTER],
            hint: None,
        },
        ViewerConfig::default(),
    );

    let result = document.run_until_idle(8);
    assert!(result.is_err(), "degenerate page size must propagate");
}

#[test]
fn background_disabled_resolves_async_requests_synchronously() {
    let mut bridge = PaginationBridge::with_slice_budget(
        ScriptedFormatter::uniform(5),
        Duration::from_millis(30),
    );
    bridge.set_background_enabled(false);

    let outcome = bridge.get_page_async(3).unwrap();
    assert_eq!(outcome, AsyncPageOutcome::Ready(LETTER));
    assert_eq!(bridge.queued_len(), 0);
}

#[test]
fn busy_state_is_an_error_result_not_a_lock() {
    // The reentrancy guard is an explicit busy state: a bridge that is mid-
    // formatting answers with this error instead of blocking or panicking.
    let busy = PaginationError::Busy;
    assert_eq!(
        busy.to_string(),
        "synchronous pagination re-entered while formatting is in progress"
    );
}

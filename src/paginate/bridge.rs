//! Synchronous and asynchronous page access over an external formatter.
//!
//! The bridge owns the break records produced so far and is the only code
//! that talks to the [`PageFormatter`]. Synchronous access pumps the
//! formatter until the requested page exists; asynchronous access queues a
//! request that a later background tick completes. Background pagination is
//! bounded by a wall-clock [`WorkSlice`] so one tick never starves input.

use std::collections::VecDeque;
use std::time::Duration;

use super::formatter::{ContentPosition, PageFormatter, PaginationEvent};
use super::work_slice::{WorkSlice, DEFAULT_PAGINATION_SLICE};
use crate::model::{PageSize, PaginationError};

/// Identifies one queued asynchronous page request for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

/// Result of [`PaginationBridge::get_page_async`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AsyncPageOutcome {
    /// The page was already formatted; its size is available now.
    Ready(PageSize),
    /// Pagination is complete and the page does not exist. Never an error.
    Missing,
    /// The request was queued; a background tick will complete it.
    Queued(RequestToken),
}

/// Completion of one queued request, reported from a background tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCompletion {
    /// Token of the completed request.
    pub token: RequestToken,
    /// The requested page number.
    pub page_number: usize,
    /// The page size, or `None` for the missing-page sentinel.
    pub size: Option<PageSize>,
}

/// Outcome of one background pagination tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationTickReport {
    /// Queued requests resolved during this tick, in FIFO arrival order.
    pub completions: Vec<PageCompletion>,
    /// Coalesced pagination events for the page-size cache.
    pub events: Vec<PaginationEvent>,
    /// True when the tick should be re-queued.
    pub more_work: bool,
}

#[derive(Debug, Clone, Copy)]
struct PageRecord {
    start: ContentPosition,
    size: PageSize,
}

#[derive(Debug, Clone, Copy)]
struct QueuedRequest {
    token: RequestToken,
    page_number: usize,
}

/// Wraps the external document formatter behind break-record bookkeeping.
#[derive(Debug)]
pub struct PaginationBridge<F> {
    formatter: F,
    /// One record per formatted page; `pages[i].start` is page i's break record.
    pages: Vec<PageRecord>,
    /// Where the next page begins; `None` once content is exhausted.
    resume: Option<ContentPosition>,
    background_enabled: bool,
    queued: VecDeque<QueuedRequest>,
    next_token: u64,
    /// Reentrancy guard: the explicit busy state.
    formatting: bool,
    /// Pages announced to the cache so far (sync-formatted pages are
    /// announced by the next tick).
    published: usize,
    completion_published: bool,
    slice_budget: Duration,
}

impl<F: PageFormatter> PaginationBridge<F> {
    /// Wrap `formatter` with the default tick budget.
    pub fn new(formatter: F) -> Self {
        Self::with_slice_budget(formatter, DEFAULT_PAGINATION_SLICE)
    }

    /// Wrap `formatter` with an explicit background tick budget.
    pub fn with_slice_budget(formatter: F, slice_budget: Duration) -> Self {
        Self {
            formatter,
            pages: Vec::new(),
            resume: Some(ContentPosition::START),
            background_enabled: true,
            queued: VecDeque::new(),
            next_token: 1,
            formatting: false,
            published: 0,
            completion_published: false,
            slice_budget,
        }
    }

    /// Enable or disable background pagination.
    ///
    /// While disabled, [`PaginationBridge::get_page_async`] resolves
    /// synchronously instead of queueing.
    pub fn set_background_enabled(&mut self, enabled: bool) {
        self.background_enabled = enabled;
    }

    /// Number of pages formatted so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True once the formatter reported the end of the content.
    pub fn is_pagination_complete(&self) -> bool {
        self.resume.is_none()
    }

    /// The formatter's cheap page-count hint, if any.
    pub fn page_count_hint(&self) -> Option<usize> {
        self.formatter.page_count_hint()
    }

    /// Break record (content position) of page `n`, if formatted.
    pub fn break_record(&self, n: usize) -> Option<ContentPosition> {
        self.pages.get(n).map(|record| record.start)
    }

    /// Number of queued asynchronous requests.
    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Get page `n` now, pumping synchronous pagination as needed.
    ///
    /// Returns `Ok(None)` (the missing-page sentinel) for `n` beyond the end
    /// of the content, and [`PaginationError::Busy`] when called while a
    /// formatting pass is already running.
    pub fn get_page_sync(&mut self, page_number: usize) -> Result<Option<PageSize>, PaginationError> {
        if self.formatting {
            return Err(PaginationError::Busy);
        }
        if let Some(record) = self.pages.get(page_number) {
            return Ok(Some(record.size));
        }

        self.formatting = true;
        while self.pages.len() <= page_number && self.resume.is_some() {
            self.format_next();
        }
        self.formatting = false;

        Ok(self.pages.get(page_number).map(|record| record.size))
    }

    /// Get page `n` later.
    ///
    /// Resolves immediately when the page is already formatted, when
    /// pagination has finished (missing sentinel), or when background
    /// pagination is disabled; otherwise queues a request completed by a
    /// later [`PaginationBridge::background_tick`].
    pub fn get_page_async(
        &mut self,
        page_number: usize,
    ) -> Result<AsyncPageOutcome, PaginationError> {
        if let Some(record) = self.pages.get(page_number) {
            return Ok(AsyncPageOutcome::Ready(record.size));
        }
        if !self.background_enabled {
            return Ok(match self.get_page_sync(page_number)? {
                Some(size) => AsyncPageOutcome::Ready(size),
                None => AsyncPageOutcome::Missing,
            });
        }
        if self.resume.is_none() {
            return Ok(AsyncPageOutcome::Missing);
        }

        let token = RequestToken(self.next_token);
        self.next_token += 1;
        self.queued.push_back(QueuedRequest { token, page_number });
        Ok(AsyncPageOutcome::Queued(token))
    }

    /// Cancel a queued request. Returns true when the request was pending.
    pub fn cancel(&mut self, token: RequestToken) -> bool {
        let before = self.queued.len();
        self.queued.retain(|request| request.token != token);
        before != self.queued.len()
    }

    /// Run one time-sliced background tick.
    ///
    /// Queued requests are processed first in FIFO arrival order, each
    /// checked against current progress; then additional pages are
    /// paginated until the wall-clock slice expires. The caller re-queues
    /// the tick while [`PaginationTickReport::more_work`] is true.
    pub fn background_tick(&mut self) -> Result<PaginationTickReport, PaginationError> {
        if self.formatting {
            return Err(PaginationError::Busy);
        }
        self.formatting = true;

        let slice = WorkSlice::new(self.slice_budget);
        let mut completions = Vec::new();

        while let Some(request) = self.queued.front().copied() {
            if let Some(record) = self.pages.get(request.page_number) {
                completions.push(PageCompletion {
                    token: request.token,
                    page_number: request.page_number,
                    size: Some(record.size),
                });
                self.queued.pop_front();
                continue;
            }
            if self.resume.is_none() {
                completions.push(PageCompletion {
                    token: request.token,
                    page_number: request.page_number,
                    size: None,
                });
                self.queued.pop_front();
                continue;
            }
            if slice.should_yield() {
                break;
            }
            self.format_next();
        }

        // Always format at least one page so a tight slice still makes
        // forward progress instead of re-queueing forever.
        while self.resume.is_some() {
            self.format_next();
            if slice.should_yield() {
                break;
            }
        }

        self.formatting = false;

        let events = self.drain_events();
        let more_work = self.resume.is_some() || !self.queued.is_empty();
        tracing::debug!(
            formatted = self.pages.len(),
            completions = completions.len(),
            more_work,
            "background pagination tick"
        );

        Ok(PaginationTickReport {
            completions,
            events,
            more_work,
        })
    }

    /// Discard break records from the page containing `pos` onward and
    /// restart background pagination there.
    ///
    /// Returns the first affected page index. Queued requests stay queued;
    /// they resolve against the re-formatted pages.
    pub fn invalidate_content_from(&mut self, pos: ContentPosition) -> usize {
        self.completion_published = false;
        if self.pages.is_empty() {
            self.resume.get_or_insert(ContentPosition::START);
            return 0;
        }

        // The page containing `pos` is the last one starting at or before it.
        let after = self.pages.partition_point(|record| record.start <= pos);
        let first_affected = after.saturating_sub(1);
        let restart = self.pages[first_affected].start;
        self.pages.truncate(first_affected);
        self.resume = Some(restart);
        self.published = self.published.min(first_affected);
        tracing::debug!(first_affected, "content invalidation restarted pagination");
        first_affected
    }

    fn format_next(&mut self) {
        let Some(start) = self.resume else {
            return;
        };
        match self.formatter.format_page(start) {
            Some(page) => {
                self.pages.push(PageRecord {
                    start,
                    size: page.size,
                });
                self.resume = page.next;
            }
            None => {
                self.resume = None;
            }
        }
    }

    fn drain_events(&mut self) -> Vec<PaginationEvent> {
        let mut events = Vec::new();
        if self.pages.len() > self.published {
            let start = self.published;
            let count = self.pages.len() - start;
            events.push(PaginationEvent::Progress { start, count });
            for (offset, record) in self.pages[start..].iter().enumerate() {
                events.push(PaginationEvent::PageMeasured {
                    page_number: start + offset,
                    size: record.size,
                });
            }
            self.published = self.pages.len();
        }
        if self.resume.is_none() && !self.completion_published {
            events.push(PaginationEvent::Completed {
                page_count: self.pages.len(),
            });
            self.completion_published = true;
        }
        events
    }

    #[cfg(test)]
    fn mark_formatting(&mut self, formatting: bool) {
        self.formatting = formatting;
    }
}

//! Paginator-facing layer.
//!
//! # Module Structure
//!
//! - `formatter`: the consumed collaborator trait ([`PageFormatter`]) and the
//!   normalized events the bridge republishes
//! - `bridge`: [`PaginationBridge`] - sync/async page access over break
//!   records, time-sliced background pagination, invalidation
//! - `work_slice`: [`WorkSlice`] - wall-clock budget for one background tick

pub mod bridge;
pub mod formatter;
pub mod work_slice;

pub use bridge::{
    AsyncPageOutcome, PageCompletion, PaginationBridge, PaginationTickReport, RequestToken,
};
pub use formatter::{ContentPosition, FormattedPage, PageFormatter, PaginationEvent};
pub use work_slice::{WorkSlice, DEFAULT_PAGINATION_SLICE};

//! Pagination reconciler.
//!
//! Turns "the following count grew by `delta`" into the `delta` newest
//! followings, walking the provider's newest-first feed page by page. The
//! walk is bounded by a page ceiling and tolerates a failing page once at
//! least one page has been read.

use crate::config::{DEFAULT_MAX_PAGES, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::twitter::{TwitterApi, TwitterError, TwitterUser};
use tracing::{debug, info, warn};

/// Why the page walk stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// At least `delta` records were collected
    Satisfied,
    /// The provider reported no further page
    Exhausted,
    /// `has_next_page` was set but no cursor came with it
    MissingCursor,
    /// The page ceiling was reached first
    PageCeiling,
    /// A page after the first one failed
    UpstreamFailure,
}

/// Result of one reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationOutcome {
    /// `false` only when the first page failed
    pub success: bool,
    /// Newest followings, at most `requested` of them
    pub records: Vec<TwitterUser>,
    /// Records received across all pages, before truncation
    pub total_fetched: usize,
    /// Pages that were fetched successfully
    pub pages_fetched: usize,
    /// The delta this outcome was asked to resolve
    pub requested: usize,
    /// Why fetching stopped; `None` for a failed outcome
    pub stop_reason: Option<StopReason>,
    /// Upstream error of the first page
    pub error: Option<TwitterError>,
}

impl ReconciliationOutcome {
    fn failed(requested: usize, error: TwitterError) -> Self {
        Self {
            success: false,
            records: Vec::new(),
            total_fetched: 0,
            pages_fetched: 0,
            requested,
            stop_reason: None,
            error: Some(error),
        }
    }

    /// Fewer records than requested were resolved
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.success && self.records.len() < self.requested
    }

    /// The page ceiling cut the walk short
    #[must_use]
    pub fn truncated_by_ceiling(&self) -> bool {
        self.stop_reason == Some(StopReason::PageCeiling)
    }
}

/// Page size for the next request: `remaining` clamped to `[20, 200]`
#[must_use]
pub fn page_size_for(remaining: usize) -> usize {
    remaining.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

/// Minimum number of upstream calls needed to resolve `delta` records
#[must_use]
pub fn pages_needed(delta: usize) -> usize {
    delta.div_ceil(MAX_PAGE_SIZE)
}

/// Walks the following feed of one account.
///
/// Holds no state between calls; concurrent reconciliations for different
/// handles may share one instance.
pub struct Reconciler<'a> {
    api: &'a dyn TwitterApi,
    max_pages: usize,
}

impl<'a> Reconciler<'a> {
    /// Reconciler with the default ceiling of ten pages
    #[must_use]
    pub fn new(api: &'a dyn TwitterApi) -> Self {
        Self {
            api,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Override the page ceiling (at least one page)
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Resolve `delta` new followings of `handle`.
    ///
    /// Pages are requested strictly one after another since each cursor comes
    /// from the previous response. A failing first page fails the outcome; a
    /// later failure keeps what was already collected.
    pub async fn reconcile(&self, handle: &str, delta: usize) -> ReconciliationOutcome {
        let mut accumulated: Vec<TwitterUser> = Vec::new();
        let mut remaining = delta;
        let mut cursor: Option<String> = None;
        let mut pages_fetched = 0;
        let mut stop_reason = StopReason::Satisfied;

        while remaining > 0 {
            if pages_fetched >= self.max_pages {
                stop_reason = StopReason::PageCeiling;
                break;
            }

            let page_size = page_size_for(remaining);
            let page = match self
                .api
                .fetch_following_page(handle, page_size, cursor.take())
                .await
            {
                Ok(page) => page,
                Err(e) if pages_fetched == 0 => {
                    warn!("First followings page for @{handle} failed: {e}");
                    return ReconciliationOutcome::failed(delta, e);
                }
                Err(e) => {
                    warn!(
                        "Followings page {} for @{handle} failed, keeping {} records: {e}",
                        pages_fetched + 1,
                        accumulated.len()
                    );
                    stop_reason = StopReason::UpstreamFailure;
                    break;
                }
            };

            let returned = page.followings.len();
            accumulated.extend(page.followings);
            remaining = remaining.saturating_sub(returned);
            pages_fetched += 1;

            debug!(
                page = pages_fetched,
                page_size, returned, remaining, "Fetched followings page"
            );

            if remaining == 0 {
                stop_reason = StopReason::Satisfied;
                break;
            }
            if !page.has_next_page {
                stop_reason = StopReason::Exhausted;
                break;
            }
            match page.next_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => {
                    warn!("Provider announced another page for @{handle} without a cursor");
                    stop_reason = StopReason::MissingCursor;
                    break;
                }
            }
        }

        let total_fetched = accumulated.len();
        accumulated.truncate(delta);

        info!(
            "Reconciled @{handle}: {} of {delta} new followings ({total_fetched} fetched, {pages_fetched} pages, {stop_reason:?})",
            accumulated.len()
        );

        ReconciliationOutcome {
            success: true,
            records: accumulated,
            total_fetched,
            pages_fetched,
            requested: delta,
            stop_reason: Some(stop_reason),
            error: None,
        }
    }
}

//! Sequential page-by-page fetching of one series.
//!
//! Pages are requested strictly in order at increasing offsets. The loop ends
//! on the first short page, on `max_pages`, or on the first failed call; a
//! failure never discards pages already returned.

use outage_core::limits::MAX_PAGE_SIZE;
use outage_core::{Error, FetchWindow, Series};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::FeedClient;
use crate::page::{Page, PageRequest};

/// Lazy cursor over the pages of one fetch window.
pub struct PageCursor {
    client: Arc<dyn FeedClient>,
    series: Series,
    window: FetchWindow,
    page_size: usize,
    max_pages: usize,
    offset: usize,
    calls: usize,
    done: bool,
}

impl PageCursor {
    pub fn new(
        client: Arc<dyn FeedClient>,
        series: Series,
        window: FetchWindow,
        page_size: usize,
        max_pages: usize,
    ) -> Self {
        Self {
            client,
            series,
            window,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            max_pages,
            offset: 0,
            calls: 0,
            done: window.is_empty(),
        }
    }

    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` once exhausted. After an error the cursor is
    /// finished and keeps returning `Ok(None)`.
    pub async fn next_page(&mut self) -> Result<Option<Page>, Error> {
        if self.done {
            return Ok(None);
        }
        if self.calls >= self.max_pages {
            warn!(
                series = %self.series,
                max_pages = self.max_pages,
                "Page limit reached before a short page"
            );
            self.done = true;
            return Ok(None);
        }

        let request = PageRequest {
            series: self.series,
            window: self.window,
            offset: self.offset,
            length: self.page_size,
        };
        self.calls += 1;

        let page = match self.client.fetch_page(&request).await {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };

        if page.is_short() {
            self.done = true;
        }
        self.offset += page.len();

        if page.is_empty() {
            return Ok(None);
        }
        Ok(Some(page))
    }

    /// Number of feed calls issued so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Everything one window produced, including a terminal error if any.
#[derive(Debug)]
pub struct FetchOutcome {
    pub pages: Vec<Page>,
    pub calls: usize,
    pub error: Option<Error>,
}

impl FetchOutcome {
    pub fn record_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    pub fn is_partial(&self) -> bool {
        self.error.is_some()
    }
}

/// Fetches complete windows from a feed client.
#[derive(Clone)]
pub struct PaginatedFetcher {
    client: Arc<dyn FeedClient>,
    page_size: usize,
    max_pages: usize,
}

impl PaginatedFetcher {
    pub fn new(client: Arc<dyn FeedClient>, page_size: usize, max_pages: usize) -> Self {
        Self {
            client,
            page_size,
            max_pages,
        }
    }

    pub fn client(&self) -> &Arc<dyn FeedClient> {
        &self.client
    }

    /// Open a lazy cursor over `window`.
    pub fn cursor(&self, series: Series, window: FetchWindow) -> PageCursor {
        PageCursor::new(
            self.client.clone(),
            series,
            window,
            self.page_size,
            self.max_pages,
        )
    }

    /// Drain a window into memory, keeping earlier pages on failure.
    pub async fn fetch_all(&self, series: Series, window: FetchWindow) -> FetchOutcome {
        let mut cursor = self.cursor(series, window);
        let mut pages = Vec::new();
        let mut error = None;

        loop {
            match cursor.next_page().await {
                Ok(Some(page)) => {
                    debug!(series = %series, offset = page.offset, records = page.len(), "Fetched page");
                    pages.push(page);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(series = %series, error = %e, pages = pages.len(), "Fetch aborted, keeping partial result");
                    error = Some(e);
                    break;
                }
            }
        }

        let outcome = FetchOutcome {
            pages,
            calls: cursor.calls(),
            error,
        };
        info!(
            series = %series,
            window = %window,
            calls = outcome.calls,
            records = outcome.record_count(),
            partial = outcome.is_partial(),
            "Fetch complete"
        );
        outcome
    }
}

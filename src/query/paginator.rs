//! Paginated listing
//!
//! Walks a provider listing page by page and streams each item to a
//! consumer. Page N is fully streamed before page N+1 is fetched, and the
//! consumer is asked after every item whether it still wants rows.

use crate::error::Result;
use std::future::Future;

/// One page of a provider listing
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

/// Receives listed items one at a time
pub trait ItemSink<T> {
    fn stream_item(&mut self, item: T) -> Result<()>;

    /// Zero once the consumer needs no more rows
    fn rows_remaining(&self) -> usize;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PaginatorOptions {
    /// End pagination when the service hands back the token just used
    pub stop_on_duplicate_token: bool,
}

/// Continuation state of a listing
#[derive(Debug)]
pub struct PageCursor {
    next_token: Option<String>,
    first_page: bool,
    stop_on_duplicate_token: bool,
}

impl PageCursor {
    pub fn new(options: PaginatorOptions) -> Self {
        Self {
            next_token: None,
            first_page: true,
            stop_on_duplicate_token: options.stop_on_duplicate_token,
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.first_page || self.next_token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }

    /// Move past the page fetched with the current token
    pub fn advance(&mut self, next: Option<String>) {
        let previous = self.next_token.take();
        self.first_page = false;

        self.next_token = match next {
            Some(token) if token.is_empty() => None,
            Some(token) if self.stop_on_duplicate_token && previous.as_deref() == Some(&token) => {
                tracing::debug!("duplicate pagination token, stopping");
                None
            }
            other => other,
        };
    }
}

/// How a listing ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    /// Every page was consumed
    Done,
    /// The consumer needed no more rows
    StoppedEarly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSummary {
    pub outcome: ListOutcome,
    pub items: usize,
    pub pages: usize,
}

impl ListSummary {
    /// A listing that never ran (unsupported region, ignorable error, ...)
    pub fn empty() -> Self {
        Self {
            outcome: ListOutcome::Done,
            items: 0,
            pages: 0,
        }
    }

    /// A listing skipped because the consumer wants no rows
    pub fn stopped_early() -> Self {
        Self {
            outcome: ListOutcome::StoppedEarly,
            ..Self::empty()
        }
    }
}

/// Fetch pages with `fetch` and stream their items into `sink`.
///
/// `fetch` receives the continuation token (`None` for the first page). A
/// fetch error aborts the listing and is returned as is.
pub async fn list_pages<T, S, F, Fut>(
    options: PaginatorOptions,
    sink: &mut S,
    mut fetch: F,
) -> Result<ListSummary>
where
    S: ItemSink<T> + ?Sized,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    if sink.rows_remaining() == 0 {
        return Ok(ListSummary::stopped_early());
    }

    let mut cursor = PageCursor::new(options);
    let mut summary = ListSummary::empty();

    while cursor.has_more_pages() {
        let page = fetch(cursor.token().map(str::to_string)).await?;
        summary.pages += 1;
        tracing::debug!(
            "page {}: {} items, more: {}",
            summary.pages,
            page.items.len(),
            page.next_token.is_some()
        );
        cursor.advance(page.next_token);

        for item in page.items {
            sink.stream_item(item)?;
            summary.items += 1;

            if sink.rows_remaining() == 0 {
                summary.outcome = ListOutcome::StoppedEarly;
                return Ok(summary);
            }
        }
    }

    Ok(summary)
}

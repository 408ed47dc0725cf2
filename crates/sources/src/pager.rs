//! Lazy page iteration over offset- or cursor-paginated endpoints.
//!
//! A [`Pager`] yields one `Result<Vec<T>>` per upstream page until the
//! endpoint reports no continuation, a page cap is reached, or an error
//! occurs. It never yields after an error. `restart` rewinds it to the
//! first page so the same pager can be replayed.

use crmsync_recon::SourceError;

/// Where the next page starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Row offset (PostgREST).
    Offset(usize),
    /// Opaque continuation token; `None` is the first page.
    After(Option<String>),
}

/// One fetched page plus the cursor for the following one.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    pub next: Option<PageCursor>,
}

/// Result of [`Pager::collect_up_to`].
#[derive(Debug, Clone, PartialEq)]
pub struct Collected<T> {
    pub items: Vec<T>,
    /// Cursor continuing exactly after `items`; `None` when the last page
    /// was cut short or the endpoint is exhausted.
    pub next: Option<PageCursor>,
    /// Rows were fetched beyond the limit and dropped.
    pub truncated: bool,
}

impl<T> Collected<T> {
    /// More rows exist upstream than were returned.
    pub fn has_more(&self) -> bool {
        self.truncated || self.next.is_some()
    }
}

/// Hard ceiling on pages per iteration.
pub const DEFAULT_MAX_PAGES: usize = 1000;

pub struct Pager<T, F>
where
    F: FnMut(&PageCursor) -> Result<Fetched<T>, SourceError>,
{
    fetch: F,
    label: String,
    start: PageCursor,
    next: Option<PageCursor>,
    pages: usize,
    max_pages: usize,
}

impl<T, F> Pager<T, F>
where
    F: FnMut(&PageCursor) -> Result<Fetched<T>, SourceError>,
{
    pub fn new(label: impl Into<String>, start: PageCursor, fetch: F) -> Self {
        Self {
            fetch,
            label: label.into(),
            next: Some(start.clone()),
            start,
            pages: 0,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Pages fetched since the last restart.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub fn restart(&mut self) {
        self.next = Some(self.start.clone());
        self.pages = 0;
    }

    /// Fetch exactly one page. `next` continues right after it; an
    /// exhausted pager yields no items.
    pub fn take_page(&mut self) -> Result<Collected<T>, SourceError> {
        let items = self.next().transpose()?.unwrap_or_default();
        Ok(Collected {
            items,
            next: self.next.clone(),
            truncated: false,
        })
    }

    /// Drain pages until `limit` items are collected or pages run out.
    pub fn collect_up_to(&mut self, limit: usize) -> Result<Collected<T>, SourceError> {
        let mut items = Vec::new();
        while items.len() < limit {
            match self.next() {
                Some(page) => items.extend(page?),
                None => break,
            }
        }
        let truncated = items.len() > limit;
        items.truncate(limit);
        let next = if truncated { None } else { self.next.clone() };
        Ok(Collected {
            items,
            next,
            truncated,
        })
    }
}

impl<T, F> Iterator for Pager<T, F>
where
    F: FnMut(&PageCursor) -> Result<Fetched<T>, SourceError>,
{
    type Item = Result<Vec<T>, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.next.take()?;

        if self.pages >= self.max_pages {
            return Some(Err(SourceError::PaginationStuck(format!(
                "{} exceeded {} pages",
                self.label, self.max_pages,
            ))));
        }

        let fetched = match (self.fetch)(&cursor) {
            Ok(f) => f,
            Err(e) => return Some(Err(e)),
        };
        self.pages += 1;

        log::debug!(
            "{}: page {} ({} items, cursor {:?})",
            self.label,
            self.pages,
            fetched.items.len(),
            cursor,
        );

        match fetched.next {
            Some(next) if next == cursor => {
                return Some(Err(SourceError::PaginationStuck(format!(
                    "{} returned the same cursor twice ({:?})",
                    self.label, next,
                ))));
            }
            Some(_) if fetched.items.is_empty() => {}
            other => self.next = other,
        }

        Some(Ok(fetched.items))
    }
}

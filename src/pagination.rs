//! Lazy iteration over cursor-paginated list endpoints.
//!
//! A list response looks like `{"count": 42, "next": "<url>", "results": [...]}`.
//! [`Paginated`] yields the `results` of each page in order and follows `next`
//! verbatim until it is `null`/absent.  Only the first request carries the
//! caller's filters; the cursor URL already encodes them.

use std::collections::{HashSet, VecDeque};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{BelvoError, Result};
use crate::filters::Filters;
use crate::session::Session;

/// One page of a list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub results: Vec<Value>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// The request that fetches the next page.
struct PageRequest {
    url: String,
    filters: Option<Filters>,
}

/// Iterator over every result of a list endpoint, fetching pages on demand.
///
/// Each call to `next` either returns a buffered item or performs one HTTP
/// request for the following page.  An error ends the sequence: it is
/// yielded once and every later call returns `None`.
///
/// ```no_run
/// use belvo_client::{Client, Filters};
///
/// let client = Client::new("key-id", "key-secret", "https://sandbox.belvo.com").unwrap();
/// for account in client.accounts().list(Filters::new().with("institution", "erebor_mx_retail")) {
///     let account = account.unwrap();
///     println!("{}", account["id"]);
/// }
/// ```
pub struct Paginated {
    session: Arc<Session>,
    buffer: VecDeque<Value>,
    pending: Option<PageRequest>,
    seen_cursors: HashSet<String>,
    pages_fetched: usize,
    count: Option<u64>,
    deferred: Option<BelvoError>,
}

impl Paginated {
    pub(crate) fn new(session: Arc<Session>, url: String, filters: Filters) -> Self {
        Self {
            session,
            buffer: VecDeque::new(),
            pending: Some(PageRequest {
                url,
                filters: Some(filters),
            }),
            seen_cursors: HashSet::new(),
            pages_fetched: 0,
            count: None,
            deferred: None,
        }
    }

    /// Number of pages requested so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Total result count reported by the most recent page, if any.
    ///
    /// Reading it never fetches a page, unlike [`Iterator::count`].
    pub fn reported_count(&self) -> Option<u64> {
        self.count
    }

    /// `true` once every page has been fetched and every item yielded.
    pub fn is_exhausted(&self) -> bool {
        self.buffer.is_empty() && self.pending.is_none() && self.deferred.is_none()
    }

    /// Deserialize each item into `T`.
    pub fn typed<T: DeserializeOwned>(self) -> Typed<T> {
        Typed {
            inner: self,
            _marker: PhantomData,
        }
    }

    fn fetch_next_page(&mut self, request: PageRequest) -> Result<()> {
        if let Some(limit) = self.session.page_limit() {
            if self.pages_fetched >= limit {
                return Err(BelvoError::PageLimitExceeded { limit });
            }
        }

        self.pages_fetched += 1;
        debug!(url = %request.url, page = self.pages_fetched, "fetching page");
        let page = self.session.fetch_page(&request.url, request.filters)?;

        self.count = page.count.or(self.count);
        self.buffer.extend(page.results);

        if let Some(next) = page.next.filter(|n| !n.is_empty()) {
            // Items of this page are still yielded before the cycle is reported.
            if !self.seen_cursors.insert(next.clone()) {
                self.deferred = Some(BelvoError::CursorCycle { url: next });
                return Ok(());
            }
            self.pending = Some(PageRequest {
                url: next,
                filters: None,
            });
        }
        Ok(())
    }
}

impl Iterator for Paginated {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if let Some(e) = self.deferred.take() {
                return Some(Err(e));
            }

            let request = self.pending.take()?;
            if let Err(e) = self.fetch_next_page(request) {
                self.buffer.clear();
                self.pending = None;
                return Some(Err(e));
            }
        }
    }
}

impl FusedIterator for Paginated {}

/// [`Paginated`] adapter yielding deserialized items.
pub struct Typed<T> {
    inner: Paginated,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Typed<T> {
    pub fn into_inner(self) -> Paginated {
        self.inner
    }
}

impl<T: DeserializeOwned> Iterator for Typed<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = match self.inner.next()? {
            Ok(value) => value,
            Err(e) => return Some(Err(e)),
        };
        Some(serde_json::from_value(value).map_err(BelvoError::from))
    }
}

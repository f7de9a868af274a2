use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{BelvoError, Result};
use crate::filters::Filters;
use crate::pagination::{Page, Paginated};

/// `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = "fapi-financial (2024)";

/// Request timeout used when a call does not override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

struct Credentials {
    key_id: String,
    key_secret: String,
}

/// Owns the HTTP transport and the credentials attached to it.
///
/// A session is configured and logged in through `&mut self`, then shared
/// read-only (usually behind an [`Arc`]) by every resource of a
/// [`Client`](crate::Client).
pub struct Session {
    base_url: String,
    http: HttpClient,
    credentials: Option<Credentials>,
    timeout: Duration,
    page_limit: Option<usize>,
}

impl Session {
    /// Create a session for the API rooted at `base_url`.
    ///
    /// No request is made until [`Session::login`].
    pub fn new(base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            page_limit: None,
        })
    }

    /// Override the default per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stop list iteration with [`BelvoError::PageLimitExceeded`] once
    /// `limit` pages have been fetched.  Unbounded by default.
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = Some(limit);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Key id of the last login attempt.
    pub fn key_id(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.key_id.as_str())
    }

    pub fn user_agent(&self) -> &'static str {
        DEFAULT_USER_AGENT
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn page_limit(&self) -> Option<usize> {
        self.page_limit
    }

    /// Log in with the default timeout.  See [`Session::login_with_timeout`].
    pub fn login(&mut self, key_id: &str, key_secret: &str) -> Result<bool> {
        self.login_with_timeout(key_id, key_secret, DEFAULT_TIMEOUT)
    }

    /// Attach Basic credentials to the session and probe `{base}/api/`.
    ///
    /// Returns `Ok(false)` when the API answers with a non-2xx status.
    /// Network failures are returned as [`BelvoError::Transport`].
    pub fn login_with_timeout(
        &mut self,
        key_id: &str,
        key_secret: &str,
        timeout: Duration,
    ) -> Result<bool> {
        self.credentials = Some(Credentials {
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        });

        let url = format!("{}/api/", self.base_url);
        debug!(url = %url, key_id, "sending login probe");

        let response = self.request(&url).timeout(timeout).send()?;
        let status = response.status();
        if status.is_success() {
            info!(base_url = %self.base_url, key_id, "logged in");
            Ok(true)
        } else {
            warn!(status = status.as_u16(), key_id, "login rejected");
            Ok(false)
        }
    }

    /// Fetch `{base}{endpoint}{id}/`.
    pub fn get_one(&self, endpoint: &str, id: &str, filters: Filters) -> Result<Value> {
        let url = format!("{}{endpoint}{id}/", self.base_url);
        self.fetch(&url, Some(filters))
    }

    /// Lazily iterate every result of `{base}{endpoint}` across all pages.
    pub fn list_many(self: &Arc<Self>, endpoint: &str, filters: Filters) -> Paginated {
        let url = format!("{}{endpoint}", self.base_url);
        Paginated::new(Arc::clone(self), url, filters)
    }

    /// Fetch and decode one list page.  `filters` is `None` for cursor URLs.
    pub(crate) fn fetch_page(&self, url: &str, filters: Option<Filters>) -> Result<Page> {
        let body = self.fetch(url, filters)?;
        Ok(serde_json::from_value(body)?)
    }

    fn fetch(&self, url: &str, filters: Option<Filters>) -> Result<Value> {
        let mut builder = self.request(url);
        let mut timeout = self.timeout;

        if let Some(mut filters) = filters {
            if let Some(t) = filters.take_timeout()? {
                timeout = t;
            }
            builder = builder.query(&filters.as_query());
        }

        debug!(url, "GET");
        let response = builder.timeout(timeout).send()?;
        handle_response(response)
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let builder = self.http.get(url);
        match &self.credentials {
            Some(c) => builder.basic_auth(&c.key_id, Some(&c.key_secret)),
            None => builder,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id())
            .field("timeout", &self.timeout)
            .field("page_limit", &self.page_limit)
            .finish_non_exhaustive()
    }
}

/// Map a response to its decoded body, or to [`BelvoError::Request`].
fn handle_response(response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.text()?;

    if status.is_success() {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_str(&body)?);
    }

    // Detail is the JSON body when there is one, the raw text otherwise.
    let detail = serde_json::from_str(&body).unwrap_or_else(|_| Value::String(body));
    warn!(status = status.as_u16(), "request failed");
    Err(BelvoError::Request {
        status: status.as_u16(),
        detail,
    })
}

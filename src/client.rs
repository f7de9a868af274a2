use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::Settings;
use crate::error::{BelvoError, Result};
use crate::filters::Filters;
use crate::pagination::Paginated;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

/// The four entity types exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Accounts,
    Links,
    Owners,
    Transactions,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Accounts,
        ResourceKind::Links,
        ResourceKind::Owners,
        ResourceKind::Transactions,
    ];

    pub fn endpoint(&self) -> &'static str {
        match self {
            ResourceKind::Accounts => "/api/accounts/",
            ResourceKind::Links => "/api/links/",
            ResourceKind::Owners => "/api/owners/",
            ResourceKind::Transactions => "/api/transactions/",
        }
    }

    /// Filters merged under the caller's filters on every `list`.
    ///
    /// Transactions are always listed per link, so a `link` key is always
    /// sent.
    pub fn default_filters(&self) -> Filters {
        match self {
            ResourceKind::Transactions => Filters::new().with("link", ""),
            _ => Filters::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Accounts => "Accounts",
            ResourceKind::Links => "Links",
            ResourceKind::Owners => "Owners",
            ResourceKind::Transactions => "Transactions",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// One endpoint of the API, bound to the client's shared [`Session`].
#[derive(Debug, Clone)]
pub struct Resource {
    kind: ResourceKind,
    session: Arc<Session>,
}

impl Resource {
    pub fn new(kind: ResourceKind, session: Arc<Session>) -> Self {
        Self { kind, session }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn endpoint(&self) -> &'static str {
        self.kind.endpoint()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Get the details of a single object by id.
    pub fn get(&self, id: &str, filters: Filters) -> Result<Value> {
        self.session.get_one(self.endpoint(), id, filters)
    }

    /// Like [`Resource::get`], deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, id: &str, filters: Filters) -> Result<T> {
        Ok(serde_json::from_value(self.get(id, filters)?)?)
    }

    /// List every object matching `filters`, across all pages.
    ///
    /// With no filters every object of the resource is returned.  Allowed
    /// filters are those of the API reference, e.g. `institution` or
    /// `balance_available__gte` for accounts.
    pub fn list(&self, mut filters: Filters) -> Paginated {
        filters.merge_defaults(&self.kind.default_filters());
        debug!(resource = %self.kind, filters = filters.len(), "listing");
        self.session.list_many(self.endpoint(), filters)
    }

    /// List the objects that belong to one link.
    pub fn list_for_link(&self, link: &str, filters: Filters) -> Paginated {
        self.list(filters.with("link", link))
    }
}

// ---------------------------------------------------------------------------
// Public client
// ---------------------------------------------------------------------------

/// Main entry point for the Belvo API.
///
/// Construction logs in; a `Client` only exists with an accepted login.
///
/// ```no_run
/// use belvo_client::{Client, Filters};
///
/// let client = Client::new("key-id", "key-secret", "https://sandbox.belvo.com").unwrap();
/// let link = client.links().get("3b1b1b1b-0000-0000-0000-000000000000", Filters::new()).unwrap();
/// println!("{}", link["institution"]);
///
/// for tx in client.transactions().list_for_link("3b1b1b1b-0000-0000-0000-000000000000", Filters::new()) {
///     println!("{}", tx.unwrap()["amount"]);
/// }
/// ```
#[derive(Debug)]
pub struct Client {
    session: Arc<Session>,
    accounts: Resource,
    links: Resource,
    owners: Resource,
    transactions: Resource,
}

impl Client {
    /// Create a client and log in.
    ///
    /// * `key_id` / `key_secret` – API secret key pair
    /// * `base_url` – environment root, e.g. `https://sandbox.belvo.com`
    ///
    /// Fails with [`BelvoError::Config`] for an empty URL (before any
    /// request) and with [`BelvoError::Authentication`] if the login probe
    /// is rejected.
    pub fn new(key_id: &str, key_secret: &str, base_url: &str) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(BelvoError::Config("You need to provide a URL.".into()));
        }
        Self::from_session(Session::new(base_url)?, key_id, key_secret)
    }

    /// Log in with a pre-configured session (timeout, page limit).
    pub fn from_session(mut session: Session, key_id: &str, key_secret: &str) -> Result<Self> {
        if session.base_url().trim().is_empty() {
            return Err(BelvoError::Config("You need to provide a URL.".into()));
        }
        if !session.login(key_id, key_secret)? {
            return Err(BelvoError::Authentication);
        }

        let session = Arc::new(session);
        Ok(Self {
            accounts: Resource::new(ResourceKind::Accounts, Arc::clone(&session)),
            links: Resource::new(ResourceKind::Links, Arc::clone(&session)),
            owners: Resource::new(ResourceKind::Owners, Arc::clone(&session)),
            transactions: Resource::new(ResourceKind::Transactions, Arc::clone(&session)),
            session,
        })
    }

    /// Build a client from loaded [`Settings`].
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.url.trim().is_empty() {
            return Err(BelvoError::Config("You need to provide a URL.".into()));
        }
        let mut session = Session::new(&settings.url)?.with_timeout(settings.timeout);
        if let Some(limit) = settings.max_pages {
            session = session.with_page_limit(limit);
        }
        Self::from_session(session, &settings.secret_id, &settings.secret_password)
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    // -- resource accessors --------------------------------------------------

    pub fn accounts(&self) -> &Resource {
        &self.accounts
    }

    pub fn links(&self) -> &Resource {
        &self.links
    }

    pub fn owners(&self) -> &Resource {
        &self.owners
    }

    pub fn transactions(&self) -> &Resource {
        &self.transactions
    }

    pub fn resource(&self, kind: ResourceKind) -> &Resource {
        match kind {
            ResourceKind::Accounts => &self.accounts,
            ResourceKind::Links => &self.links,
            ResourceKind::Owners => &self.owners,
            ResourceKind::Transactions => &self.transactions,
        }
    }
}

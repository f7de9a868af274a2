use serde_json::Value;

use crate::{Client, Filters, Paginated, ResourceKind, Result as BelvoResult, Settings};

/// Items pulled from the current listing per `load_more`.
pub(crate) const CHUNK_SIZE: usize = 25;

/// Represents the current screen being displayed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AppScreen {
    /// Connect screen - shows the configured environment.
    Connect,
    /// Logging in.
    Connecting,
    /// Resource kind selection screen.
    ResourceSelection,
    /// Pulling the next chunk of items.
    LoadingItems,
    /// Item table.
    ItemTable,
    /// Fetching a single item.
    LoadingDetails,
    /// Raw JSON of a single item.
    Details,
}

/// Main application state.
pub struct AppState {
    /// Current screen being displayed.
    pub(crate) screen: AppScreen,
    /// Loaded settings, `None` if they could not be read.
    pub(crate) settings: Option<Settings>,
    /// Logged-in API client.
    pub(crate) client: Option<Client>,
    /// Currently selected index in `ResourceKind::ALL`.
    pub(crate) selected_kind_index: usize,
    /// Kind of the items in the table.
    pub(crate) listed_kind: ResourceKind,
    /// Link the listed items are restricted to.
    pub(crate) link_filter: Option<String>,
    /// Remaining pages of the current listing.
    pub(crate) listing: Option<Paginated>,
    /// Items pulled so far.
    pub(crate) items: Vec<Value>,
    /// Total count reported by the API.
    pub(crate) total_count: Option<u64>,
    /// Currently selected row in table.
    pub(crate) selected_row: usize,
    /// Item shown on the details screen.
    pub(crate) detail: Option<Value>,
    /// Vertical scroll of the details screen.
    pub(crate) detail_scroll: u16,
    /// Error message to display.
    pub(crate) error_message: Option<String>,
    /// Should the application quit?
    pub should_quit: bool,
}

impl AppState {
    /// Create the application state from the result of loading settings.
    pub fn new(settings: BelvoResult<Settings>) -> Self {
        let (settings, error_message) = match settings {
            Ok(s) => (Some(s), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            screen: AppScreen::Connect,
            settings,
            client: None,
            selected_kind_index: 0,
            listed_kind: ResourceKind::Accounts,
            link_filter: None,
            listing: None,
            items: Vec::new(),
            total_count: None,
            selected_row: 0,
            detail: None,
            detail_scroll: 0,
            error_message,
            should_quit: false,
        }
    }

    /// Log in with the loaded settings.
    pub(crate) fn connect(&mut self) -> Result<(), String> {
        let settings = self
            .settings
            .as_ref()
            .ok_or("Settings not loaded; check BELVO_* variables")?;
        match Client::from_settings(settings) {
            Ok(client) => {
                self.client = Some(client);
                Ok(())
            }
            Err(e) => Err(format!("Failed to connect: {e}")),
        }
    }

    pub(crate) fn selected_kind(&self) -> ResourceKind {
        ResourceKind::ALL[self.selected_kind_index]
    }

    /// Start a fresh listing; items are pulled by `load_more`.
    pub(crate) fn start_listing(
        &mut self,
        kind: ResourceKind,
        link: Option<String>,
    ) -> Result<(), String> {
        let client = self.client.as_ref().ok_or("Client not initialized")?;
        let resource = client.resource(kind);
        let listing = match &link {
            Some(id) => resource.list_for_link(id, Filters::new()),
            None => resource.list(Filters::new()),
        };

        self.listed_kind = kind;
        self.link_filter = link;
        self.listing = Some(listing);
        self.items.clear();
        self.total_count = None;
        self.selected_row = 0;
        self.screen = AppScreen::LoadingItems;
        Ok(())
    }

    /// Pull up to [`CHUNK_SIZE`] more items from the current listing.
    pub(crate) fn load_more(&mut self) -> Result<(), String> {
        let Some(listing) = self.listing.as_mut() else {
            return Ok(());
        };

        for _ in 0..CHUNK_SIZE {
            match listing.next() {
                Some(Ok(item)) => self.items.push(item),
                Some(Err(e)) => {
                    self.listing = None;
                    return Err(format!("Failed to list {}: {e}", self.listed_kind));
                }
                None => break,
            }
        }

        self.total_count = listing.reported_count();
        if listing.is_exhausted() {
            self.listing = None;
        }
        Ok(())
    }

    pub(crate) fn has_more(&self) -> bool {
        self.listing.is_some()
    }

    pub(crate) fn selected_id(&self) -> Option<&str> {
        self.items
            .get(self.selected_row)
            .and_then(|item| item.get("id"))
            .and_then(Value::as_str)
    }

    /// Fetch the selected item by id.
    pub(crate) fn fetch_details(&mut self) -> Result<(), String> {
        let client = self.client.as_ref().ok_or("Client not initialized")?;
        let id = self
            .selected_id()
            .ok_or("Selected item has no id")?
            .to_string();
        match client.resource(self.listed_kind).get(&id, Filters::new()) {
            Ok(detail) => {
                self.detail = Some(detail);
                self.detail_scroll = 0;
                Ok(())
            }
            Err(e) => Err(format!("Failed to fetch {id}: {e}")),
        }
    }

    /// Clear any error message.
    pub(crate) fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// Set an error message.
    pub(crate) fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
    }
}

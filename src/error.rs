use thiserror::Error;

/// Error type for Belvo API operations.
///
/// - `Config` — invalid construction input or settings
/// - `Authentication` — the login probe was rejected
/// - `Request` — any non-2xx detail or page response, with the decoded body
/// - `Transport` — network failures, passed through from `reqwest`
/// - `Decode` — a 2xx body that is not the expected JSON shape
/// - `PageLimitExceeded` / `CursorCycle` — pagination guards
#[derive(Debug, Error)]
pub enum BelvoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Login failed.")]
    Authentication,

    #[error("Request failed with status {status}: {detail}")]
    Request {
        status: u16,
        detail: serde_json::Value,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Pagination stopped after {limit} pages")]
    PageLimitExceeded { limit: usize },

    #[error("Pagination cursor points back to an already fetched page: {url}")]
    CursorCycle { url: String },
}

impl BelvoError {
    /// HTTP status of a `Request` error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            BelvoError::Request { status, .. } => Some(*status),
            BelvoError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BelvoError>;

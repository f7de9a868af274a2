use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::{BelvoError, Result};
use crate::filters::parse_timeout;
use crate::session::DEFAULT_TIMEOUT;

/// Belvo environment, used to pick a base URL when `BELVO_URL` is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => "https://sandbox.belvo.com",
            Environment::Development => "https://development.belvo.com",
            Environment::Production => "https://api.belvo.com",
        }
    }
}

impl FromStr for Environment {
    type Err = BelvoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Environment::Sandbox),
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            other => Err(BelvoError::Config(format!(
                "Unknown APP_ENV '{other}': expected sandbox, development or production"
            ))),
        }
    }
}

/// Connection settings for a [`Client`](crate::Client).
///
/// Read from the process environment (and a `.env` file, if present):
///
/// - `BELVO_SECRET_ID` (required)
/// - `BELVO_SECRET_PASSWORD` (required)
/// - `BELVO_URL` (optional, defaults to the URL of `APP_ENV`)
/// - `APP_ENV` (optional, `sandbox` | `development` | `production`, defaults to `sandbox`)
/// - `BELVO_TIMEOUT_SECS` (optional, seconds, decimals allowed, defaults to 5)
/// - `BELVO_MAX_PAGES` (optional, unbounded when unset)
#[derive(Clone)]
pub struct Settings {
    pub secret_id: String,
    pub secret_password: String,
    pub url: String,
    pub environment: Environment,
    pub timeout: Duration,
    pub max_pages: Option<usize>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(e) => debug!("no .env file loaded: {e}"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BelvoError::Config(format!("{key} not set")))
        };

        let environment = match lookup("APP_ENV") {
            Some(raw) => raw.parse()?,
            None => Environment::default(),
        };

        let url = lookup("BELVO_URL").unwrap_or_else(|| environment.base_url().to_string());

        let timeout = match lookup("BELVO_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT,
            Some(raw) => parse_timeout(&raw, "BELVO_TIMEOUT_SECS")?,
        };

        let max_pages = match lookup("BELVO_MAX_PAGES") {
            None => None,
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                BelvoError::Config(format!(
                    "Invalid BELVO_MAX_PAGES '{raw}': must be a non-negative integer"
                ))
            })?),
        };

        Ok(Self {
            secret_id: required("BELVO_SECRET_ID")?,
            secret_password: required("BELVO_SECRET_PASSWORD")?,
            url,
            environment,
            timeout,
            max_pages,
        })
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("secret_id", &self.secret_id)
            .field("secret_password", &"***")
            .field("url", &self.url)
            .field("environment", &self.environment)
            .field("timeout", &self.timeout)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

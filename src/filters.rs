use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{BelvoError, Result};

/// Query key that overrides the request timeout instead of being sent.
pub const TIMEOUT_KEY: &str = "timeout";

/// Query parameters for `get` / `list` calls.
///
/// Keys are unique; inserting an existing key replaces its value.  Iteration
/// order is the sorted key order, so the outgoing query string is stable.
///
/// ```
/// use belvo_client::Filters;
///
/// let filters = Filters::new()
///     .with("institution", "erebor_mx_retail")
///     .with("balance_available__gte", 100);
/// assert_eq!(filters.get("balance_available__gte"), Some("100"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(BTreeMap<String, String>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Filters::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> Option<String> {
        self.0.insert(key.into(), value.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Add every default whose key the caller did not set.
    pub fn merge_defaults(&mut self, defaults: &Filters) {
        for (key, value) in &defaults.0 {
            self.0
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Remove the `timeout` key and parse it as seconds.
    pub fn take_timeout(&mut self) -> Result<Option<Duration>> {
        let Some(raw) = self.0.remove(TIMEOUT_KEY) else {
            return Ok(None);
        };
        parse_timeout(&raw, TIMEOUT_KEY).map(Some)
    }

    /// Borrowed `(key, value)` pairs in the shape `reqwest` expects.
    pub(crate) fn as_query(&self) -> Vec<(&str, &str)> {
        self.iter().collect()
    }
}

/// Parse a timeout given in seconds, integer or decimal. Zero, negative and
/// non-finite values are rejected. `name` only labels the error message.
pub(crate) fn parse_timeout(raw: &str, name: &str) -> Result<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| BelvoError::Config(format!("Invalid {name} '{raw}': expected seconds")))?;
    if secs <= 0.0 {
        return Err(BelvoError::Config(format!(
            "Invalid {name} '{raw}': must be greater than zero"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| BelvoError::Config(format!("Invalid {name} '{raw}': out of range")))
}

impl<K, V> FromIterator<(K, V)> for Filters
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (k, v) in iter {
            filters.insert(k, v);
        }
        filters
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Filters
where
    K: Into<String>,
    V: ToString,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

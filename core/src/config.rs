//! Runtime configuration, read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::DEFAULT_LIMIT;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_STATE_PATH: &str = "feed-state.json";
pub const DEFAULT_FLUSH_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin every request path is appended to.
    pub base_url: String,
    pub page_limit: u32,
    /// Where the persisted state lives.
    pub state_path: PathBuf,
    pub flush_debounce: Duration,
    /// `None` leaves the transport's default in place.
    pub http_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            page_limit: DEFAULT_LIMIT,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            flush_debounce: DEFAULT_FLUSH_DEBOUNCE,
            http_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Read `FEED_API_URL`, `FEED_PAGE_LIMIT`, `FEED_STATE_PATH`,
    /// `FEED_FLUSH_DEBOUNCE_MS` and `FEED_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup("FEED_API_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(limit) = parse_var::<u32>(&lookup, "FEED_PAGE_LIMIT", "a positive integer")? {
            if limit == 0 {
                return Err(ConfigError::BadValue {
                    name: "FEED_PAGE_LIMIT",
                    expected: "a positive integer",
                    value: "0".to_string(),
                });
            }
            config.page_limit = limit;
        }
        if let Some(path) = lookup("FEED_STATE_PATH").filter(|v| !v.trim().is_empty()) {
            config.state_path = PathBuf::from(path);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "FEED_FLUSH_DEBOUNCE_MS", "milliseconds")? {
            config.flush_debounce = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "FEED_HTTP_TIMEOUT_SECS", "seconds")? {
            config.http_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::BadValue {
            name,
            expected,
            value: raw,
        })
}

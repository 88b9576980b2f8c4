//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handlers never read process-wide environment variables;
//! the binaries read them once and hand the raw values to the parse helpers below.

use crate::constants::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_PAGE_SIZE, DEFAULT_SOURCE_BASE_URL};
use crate::error::{ConfigError, ConfigResult};
use std::time::Duration;
use url::Url;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    source_base_url: Url,
    page_size: u64,
    fetch_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// The base URL is normalised to end with `/` so relative page addresses join beneath it
    /// rather than replacing its last path segment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - `source_base_url` is not an absolute http(s) URL,
    /// - `page_size` is zero,
    /// - `fetch_timeout` is zero.
    pub fn new(source_base_url: &str, page_size: u64, fetch_timeout: Duration) -> ConfigResult<Self> {
        let mut base = source_base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let source_base_url = Url::parse(&base)?;
        if !matches!(source_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidInput(format!(
                "source URL must use http or https, got '{}'",
                source_base_url.scheme()
            )));
        }

        if page_size == 0 {
            return Err(ConfigError::InvalidInput("page size must be greater than zero".into()));
        }
        if fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidInput(
                "fetch timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            source_base_url,
            page_size,
            fetch_timeout,
        })
    }

    /// Build a configuration from optional raw environment values, applying defaults for
    /// anything absent or blank.
    pub fn from_env_values(
        source_base_url: Option<String>,
        page_size: Option<String>,
        fetch_timeout_secs: Option<String>,
    ) -> ConfigResult<Self> {
        let source_base_url = non_blank(source_base_url)
            .unwrap_or_else(|| DEFAULT_SOURCE_BASE_URL.to_string());
        let page_size = page_size_from_env_value(page_size)?;
        let fetch_timeout = fetch_timeout_from_env_value(fetch_timeout_secs)?;
        Self::new(&source_base_url, page_size, fetch_timeout)
    }

    pub fn source_base_url(&self) -> &Url {
        &self.source_base_url
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the page size from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_PAGE_SIZE`].
pub fn page_size_from_env_value(value: Option<String>) -> ConfigResult<u64> {
    match non_blank(value) {
        None => Ok(DEFAULT_PAGE_SIZE),
        Some(v) => v
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidInput(format!("invalid page size '{v}': {e}"))),
    }
}

/// Parse the fetch timeout (whole seconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_FETCH_TIMEOUT_SECS`].
pub fn fetch_timeout_from_env_value(value: Option<String>) -> ConfigResult<Duration> {
    let secs = match non_blank(value) {
        None => DEFAULT_FETCH_TIMEOUT_SECS,
        Some(v) => v
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidInput(format!("invalid fetch timeout '{v}': {e}")))?,
    };
    Ok(Duration::from_secs(secs))
}

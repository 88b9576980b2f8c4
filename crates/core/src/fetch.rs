//! Boundary to the remote paginated source.
//!
//! The core only needs one capability from the outside world: given a page address, return the
//! page. [`PageFetcher`] is that seam; [`HttpPageFetcher`] is the production implementation
//! against a FHIR server.

use crate::config::CoreConfig;
use crate::constants::FHIR_JSON_MEDIA_TYPE;
use crate::error::{CohortResult, Failure};
use fhir::{Bundle, BundlePage};
use reqwest::header::ACCEPT;
use url::Url;

/// Fetches one page by address. Every failure is a [`Failure::Fault`].
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, address: &str) -> CohortResult<BundlePage>;
}

/// Blocking HTTP client for a FHIR search endpoint.
pub struct HttpPageFetcher {
    base_url: Url,
    client: reqwest::blocking::Client,
}

impl HttpPageFetcher {
    /// Create a fetcher using the configured base URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::Fault`] if the HTTP client cannot be built.
    pub fn new(cfg: &CoreConfig) -> CohortResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(cfg.fetch_timeout())
            .build()
            .map_err(|e| Failure::fault(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: cfg.source_base_url().clone(),
            client,
        })
    }

    /// Absolute URL for `address`: absolute addresses are used as given, anything else is
    /// joined beneath the configured base.
    pub fn resolve_address(&self, address: &str) -> CohortResult<Url> {
        resolve_address(&self.base_url, address)
    }
}

pub(crate) fn resolve_address(base_url: &Url, address: &str) -> CohortResult<Url> {
    let address = address.trim();
    let resolved = if address.starts_with("http://") || address.starts_with("https://") {
        Url::parse(address)
    } else {
        base_url.join(address.trim_start_matches('/'))
    };
    resolved.map_err(|e| Failure::fault(format!("invalid page address '{address}': {e}")))
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, address: &str) -> CohortResult<BundlePage> {
        let url = self.resolve_address(address)?;

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, FHIR_JSON_MEDIA_TYPE)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    Failure::fault(format!("fetching {url} timed out"))
                } else {
                    Failure::fault(format!("fetching {url} failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Failure::fault(format!("{url} returned HTTP {status}")));
        }

        let body = response.text()?;
        Bundle::parse_json(&body)
            .map_err(|e| Failure::fault(format!("malformed page at {url}: {e}")))
    }
}

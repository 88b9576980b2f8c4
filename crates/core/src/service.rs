//! Cohort operations offered to the API layers.
//!
//! [`CohortService`] is constructed once at startup and shared (it is cheap to clone) with every
//! request handler. It owns the process-wide [`ResultCache`] and the page source.

use crate::cache::ResultCache;
use crate::config::CoreConfig;
use crate::error::{CohortResult, Failure};
use crate::fetch::{HttpPageFetcher, PageFetcher};
use crate::graph::{ReferenceGraphBuilder, RootTree};
use crate::sequencer::PageSequencer;
use cohort_uuid::ResultId;
use fhir::BundlePage;
use std::sync::Arc;

/// Size summary of a cached result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResultStats {
    pub total_size: u64,
    pub number_of_pages: u64,
}

/// Pages needed to hold `total` records at `page_size` per page.
pub fn number_of_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

#[derive(Clone)]
pub struct CohortService {
    cfg: Arc<CoreConfig>,
    cache: Arc<ResultCache>,
    fetcher: Arc<dyn PageFetcher>,
    sequencer: PageSequencer,
}

impl CohortService {
    pub fn new(cfg: Arc<CoreConfig>, fetcher: Arc<dyn PageFetcher>) -> Self {
        let cache = Arc::new(ResultCache::new());
        let sequencer = PageSequencer::new(Arc::clone(&cache), Arc::clone(&fetcher));
        Self {
            cfg,
            cache,
            fetcher,
            sequencer,
        }
    }

    /// Service backed by an [`HttpPageFetcher`] for the configured FHIR server.
    pub fn with_http(cfg: Arc<CoreConfig>) -> CohortResult<Self> {
        let fetcher = HttpPageFetcher::new(&cfg)?;
        Ok(Self::new(cfg, Arc::new(fetcher)))
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Register a result from the facts of its first page.
    pub fn create_result(
        &self,
        total: u64,
        self_address: Option<&str>,
        next_address: Option<&str>,
    ) -> CohortResult<ResultId> {
        self.cache
            .create(total, self_address, next_address)
            .map(|entry| entry.id())
    }

    pub fn result_stats(&self, id: &ResultId) -> CohortResult<ResultStats> {
        let entry = self
            .cache
            .get(id)
            .ok_or_else(|| Failure::not_found(format!("result {id} does not exist")))?;
        Ok(ResultStats {
            total_size: entry.total(),
            number_of_pages: number_of_pages(entry.total(), self.cfg.page_size()),
        })
    }

    pub fn page(&self, id: &ResultId, page_num: usize) -> CohortResult<BundlePage> {
        self.sequencer.fetch_page(id, page_num)
    }

    /// Fetch a page and fold its records into a subject tree.
    pub fn page_tree(&self, id: &ResultId, page_num: usize) -> CohortResult<RootTree> {
        self.page(id, page_num)
            .map(|page| ReferenceGraphBuilder::build(page.records))
    }

    /// Run a search against the source and register its first page as a new result.
    ///
    /// `query` may be absolute or relative to the configured base URL. When the first page
    /// carries no `total`, the number of records on it is used.
    ///
    /// # Errors
    ///
    /// - [`Failure::Fault`] if the first page cannot be fetched.
    /// - [`Failure::NotFound`] if the first page has no self link.
    pub fn open_query(&self, query: &str) -> CohortResult<ResultId> {
        let first = self.fetcher.fetch(query)?;
        let total = first.total.unwrap_or(first.records.len() as u64);
        self.create_result(
            total,
            first.self_link.as_deref(),
            first.next_link.as_deref(),
        )
    }
}

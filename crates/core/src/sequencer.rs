//! Random page access over a forward-only paginated source.
//!
//! A page's address is only learned from the `next` link of the page before it. The first
//! request for page N therefore replays the chain from the earliest known page, recording every
//! address it passes; afterwards any page up to the furthest one reached is a single fetch.

use crate::cache::ResultCache;
use crate::error::{CohortResult, Failure};
use crate::fetch::PageFetcher;
use cohort_uuid::ResultId;
use fhir::BundlePage;
use std::sync::Arc;

/// Resolves page requests against the [`ResultCache`], walking forward on a miss.
#[derive(Clone)]
pub struct PageSequencer {
    cache: Arc<ResultCache>,
    fetcher: Arc<dyn PageFetcher>,
}

impl PageSequencer {
    pub fn new(cache: Arc<ResultCache>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { cache, fetcher }
    }

    /// Fetch page `page_num` of result `id`.
    ///
    /// With a cached address this is one fetch. Otherwise the chain is walked from the smallest
    /// known page while the current page number is at most `page_num`, saving each `next`
    /// address for the following page number.
    ///
    /// There is no hop limit: a distant page costs one synchronous fetch per page in between.
    ///
    /// # Errors
    ///
    /// - [`Failure::NotFound`] if the result does not exist or the chain ends before
    ///   `page_num`.
    /// - [`Failure::Fault`] if any fetch fails; the walk stops at the first one.
    pub fn fetch_page(&self, id: &ResultId, page_num: usize) -> CohortResult<BundlePage> {
        if let Some(address) = self.cache.get_page_address(id, page_num) {
            return self.fetch_known(id, page_num, &address);
        }

        let start = self
            .cache
            .min_known_page(id)
            .ok_or_else(|| Failure::not_found(format!("result {id} does not exist")))?;

        if let Some(page) = self.walk_forward(id, start, page_num)? {
            return Ok(page);
        }

        match self.cache.get_page_address(id, page_num) {
            Some(address) => self.fetch_known(id, page_num, &address),
            None => Err(Failure::not_found(format!(
                "page {page_num} of result {id} is past the last page"
            ))),
        }
    }

    fn fetch_known(&self, id: &ResultId, page_num: usize, address: &str) -> CohortResult<BundlePage> {
        let page = self.fetch_logged(id, page_num, address)?;
        if let Some(next) = page.next_link.as_deref() {
            self.cache.save_page_address(id, page_num + 1, next);
        }
        Ok(page)
    }

    /// Replay pages `start..=target`, recording next links. Returns the target page if the walk
    /// reached it, or `None` if the chain ran out first.
    fn walk_forward(
        &self,
        id: &ResultId,
        start: usize,
        target: usize,
    ) -> CohortResult<Option<BundlePage>> {
        let mut current = start;
        while current <= target {
            let Some(address) = self.cache.get_page_address(id, current) else {
                break;
            };
            let page = self.fetch_logged(id, current, &address)?;

            if let Some(next) = page.next_link.as_deref() {
                self.cache.save_page_address(id, current + 1, next);
            }
            if current == target {
                return Ok(Some(page));
            }
            if page.next_link.is_none() {
                tracing::debug!(result_id = %id, page = current, target, "page chain ended");
                break;
            }
            current += 1;
        }
        Ok(None)
    }

    fn fetch_logged(&self, id: &ResultId, page_num: usize, address: &str) -> CohortResult<BundlePage> {
        tracing::debug!(result_id = %id, page = page_num, address, "fetching page");
        self.fetcher.fetch(address).map_err(|err| {
            tracing::warn!(result_id = %id, page = page_num, error = %err, "page fetch failed");
            err
        })
    }
}

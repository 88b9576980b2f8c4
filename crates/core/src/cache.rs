//! Process-wide cache of cohort results and their discovered page addresses.
//!
//! The remote source only exposes forward pagination: each page advertises the address of the
//! next one. A result therefore starts with page 0 (and possibly page 1) known, and learns further
//! addresses as pages are walked. Entries are never evicted.
//!
//! Concurrency:
//! - Entries live in a sharded map, so work on one result never blocks another.
//! - Each entry's page map is itself concurrent. [`ResultCache::save_page_address`] is
//!   insert-if-absent: when two callers discover the same page, the first write is kept and the
//!   second is ignored. Page fetches are idempotent, so this needs no further coordination.

use crate::error::{CohortResult, Failure};
use cohort_uuid::ResultId;
use dashmap::DashMap;
use std::sync::Arc;

/// One cached cohort result: its total size and every page address discovered so far.
#[derive(Debug)]
pub struct ResultEntry {
    id: ResultId,
    total: u64,
    pages: DashMap<usize, String>,
}

impl ResultEntry {
    fn new(id: ResultId, total: u64) -> Self {
        Self {
            id,
            total,
            pages: DashMap::new(),
        }
    }

    pub fn id(&self) -> ResultId {
        self.id
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn page_address(&self, page: usize) -> Option<String> {
        self.pages.get(&page).map(|address| address.value().clone())
    }

    /// Smallest page number with a known address.
    pub fn min_known_page(&self) -> Option<usize> {
        self.pages.iter().map(|entry| *entry.key()).min()
    }

    /// Insert `address` for `page` unless one is already recorded. Returns whether it was stored.
    pub fn save_page_address(&self, page: usize, address: &str) -> bool {
        let address = address.trim();
        if address.is_empty() {
            return false;
        }
        let mut inserted = false;
        self.pages.entry(page).or_insert_with(|| {
            inserted = true;
            address.to_string()
        });
        inserted
    }
}

/// Table of all results created during the life of the process.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: DashMap<ResultId, Arc<ResultEntry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new result from its first page.
    ///
    /// Seeds page 0 with `self_address` and, when present, page 1 with `next_address`.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::NotFound`] if `self_address` is absent or blank.
    pub fn create(
        &self,
        total: u64,
        self_address: Option<&str>,
        next_address: Option<&str>,
    ) -> CohortResult<Arc<ResultEntry>> {
        let self_address = self_address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| Failure::not_found("missing self address"))?;

        let entry = Arc::new(ResultEntry::new(ResultId::new(), total));
        entry.save_page_address(0, self_address);
        if let Some(next) = next_address {
            entry.save_page_address(1, next);
        }

        self.entries.insert(entry.id(), Arc::clone(&entry));
        tracing::info!(result_id = %entry.id(), total, "created cohort result");
        Ok(entry)
    }

    pub fn get(&self, id: &ResultId) -> Option<Arc<ResultEntry>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_page_address(&self, id: &ResultId, page: usize) -> Option<String> {
        self.get(id).and_then(|entry| entry.page_address(page))
    }

    /// Smallest cached page number for `id`; the point a forward walk resumes from.
    pub fn min_known_page(&self, id: &ResultId) -> Option<usize> {
        self.get(id).and_then(|entry| entry.min_known_page())
    }

    /// Record a discovered page address; first writer wins. Unknown ids are ignored.
    pub fn save_page_address(&self, id: &ResultId, page: usize, address: &str) -> bool {
        match self.get(id) {
            Some(entry) => entry.save_page_address(page, address),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn create_without_self_address_is_not_found() {
        let cache = ResultCache::new();
        let err = cache.create(10, None, None).expect_err("self address required");
        assert!(err.is_not_found());
        assert_eq!(err.message(), "missing self address");

        let err = cache.create(10, Some("   "), Some("B")).expect_err("blank self address");
        assert!(err.is_not_found());
        assert!(cache.is_empty());
    }

    #[test]
    fn create_with_only_self_address_seeds_page_zero() {
        let cache = ResultCache::new();
        let entry = cache.create(10, Some("A"), None).expect("create");
        let id = entry.id();

        assert_eq!(cache.get_page_address(&id, 0).as_deref(), Some("A"));
        assert_eq!(cache.get_page_address(&id, 1), None);
        assert_eq!(cache.get(&id).expect("entry").total(), 10);
    }

    #[test]
    fn create_with_next_address_seeds_page_one() {
        let cache = ResultCache::new();
        let id = cache.create(120, Some("A"), Some("B")).expect("create").id();

        assert_eq!(cache.get_page_address(&id, 1).as_deref(), Some("B"));
        assert_eq!(cache.min_known_page(&id), Some(0));
        assert!(cache.get_page_address(&id, 2).is_none());
    }

    #[test]
    fn each_create_gets_a_fresh_id() {
        let cache = ResultCache::new();
        let a = cache.create(1, Some("A"), None).expect("create").id();
        let b = cache.create(1, Some("A"), None).expect("create").id();
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn save_is_first_writer_wins() {
        let cache = ResultCache::new();
        let id = cache.create(10, Some("A"), None).expect("create").id();

        assert!(cache.save_page_address(&id, 2, "X"));
        assert!(!cache.save_page_address(&id, 2, "Y"));
        assert_eq!(cache.get_page_address(&id, 2).as_deref(), Some("X"));
    }

    #[test]
    fn min_known_page_is_smallest_not_largest() {
        let cache = ResultCache::new();
        let id = cache.create(10, Some("A"), Some("B")).expect("create").id();
        cache.save_page_address(&id, 5, "F");
        assert_eq!(cache.min_known_page(&id), Some(0));
    }

    #[test]
    fn unknown_ids_yield_nothing() {
        let cache = ResultCache::new();
        let id = ResultId::new();
        assert!(cache.get(&id).is_none());
        assert!(cache.get_page_address(&id, 0).is_none());
        assert!(cache.min_known_page(&id).is_none());
        assert!(!cache.save_page_address(&id, 0, "A"));
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_saves_keep_exactly_one_address() {
        let cache = ResultCache::new();
        let id = cache.create(10, Some("A"), None).expect("create").id();

        let winners: usize = thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|n| {
                    let cache = &cache;
                    scope.spawn(move || cache.save_page_address(&id, 3, &format!("addr-{n}")))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("thread panicked"))
                .filter(|inserted| *inserted)
                .count()
        });

        assert_eq!(winners, 1);
        let stored = cache.get_page_address(&id, 3).expect("address stored");
        assert!(stored.starts_with("addr-"));
    }

    #[test]
    fn independent_results_do_not_interfere() {
        let cache = ResultCache::new();
        thread::scope(|scope| {
            for n in 0..8 {
                let cache = &cache;
                scope.spawn(move || {
                    let id = cache
                        .create(n, Some(&format!("self-{n}")), None)
                        .expect("create")
                        .id();
                    for page in 1..20 {
                        cache.save_page_address(&id, page, &format!("r{n}-p{page}"));
                    }
                    assert_eq!(cache.get_page_address(&id, 19), Some(format!("r{n}-p19")));
                });
            }
        });
        assert_eq!(cache.len(), 8);
    }
}

//! In-memory page source shared by the core's unit tests.

use crate::error::{CohortResult, Failure};
use crate::fetch::PageFetcher;
use fhir::{BundlePage, Record};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serves pages from a map keyed by address and records every address asked for.
#[derive(Default)]
pub(crate) struct MemoryFetcher {
    pages: HashMap<String, BundlePage>,
    faults: Vec<String>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    /// A linear chain of pages `addresses[0] -> addresses[1] -> ...`, each holding one patient.
    pub(crate) fn chain(addresses: &[&str], total: u64) -> Self {
        let mut fetcher = Self::default();
        for (n, address) in addresses.iter().enumerate() {
            let next = addresses.get(n + 1).map(|a| a.to_string());
            fetcher.insert(address, page(address, next.as_deref(), Some(total), &format!("p{n}")));
        }
        fetcher
    }

    pub(crate) fn insert(&mut self, address: &str, page: BundlePage) {
        self.pages.insert(address.to_string(), page);
    }

    /// Make `address` fail with a fault.
    pub(crate) fn fail_at(mut self, address: &str) -> Self {
        self.faults.push(address.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl PageFetcher for MemoryFetcher {
    fn fetch(&self, address: &str) -> CohortResult<BundlePage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(address.to_string());
        }
        if self.faults.iter().any(|a| a == address) {
            return Err(Failure::fault(format!("connection reset fetching {address}")));
        }
        self.pages
            .get(address)
            .cloned()
            .ok_or_else(|| Failure::fault(format!("{address} returned HTTP 404 Not Found")))
    }
}

/// A page at `address` holding a single patient with id `patient_id`.
pub(crate) fn page(
    address: &str,
    next: Option<&str>,
    total: Option<u64>,
    patient_id: &str,
) -> BundlePage {
    let patient = Record::from_value(json!({ "resourceType": "Patient", "id": patient_id }))
        .expect("valid patient");
    BundlePage {
        total,
        self_link: Some(address.to_string()),
        next_link: next.map(str::to_string),
        records: vec![patient],
    }
}

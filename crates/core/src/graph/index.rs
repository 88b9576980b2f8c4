//! Arena of records addressed by reference key.
//!
//! Records are stored once in insertion order and handed out as [`RecordHandle`]s. Tree nodes
//! hold handles rather than pointers back to their parents, so the finished tree has a single
//! owner and no cycles.

use fhir::{Record, ReferenceKey};
use std::collections::HashMap;

/// Lightweight handle to a record inside the [`ReferenceIndex`] that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordHandle(usize);

/// Every record of one batch, keyed by `"<Type>/<id>"`.
///
/// Keys are unique. Inserting a second record under an existing key replaces the stored record
/// in place (last write wins) and returns the original handle.
#[derive(Clone, Debug, Default)]
pub struct ReferenceIndex {
    records: Vec<Record>,
    by_key: HashMap<ReferenceKey, RecordHandle>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, record: Record) -> RecordHandle {
        let key = record.key();
        if let Some(&handle) = self.by_key.get(&key) {
            self.records[handle.0] = record;
            return handle;
        }
        let handle = RecordHandle(self.records.len());
        self.records.push(record);
        self.by_key.insert(key, handle);
        handle
    }

    /// Record behind `handle`, or `None` for a handle issued by a different index.
    pub fn get(&self, handle: RecordHandle) -> Option<&Record> {
        self.records.get(handle.0)
    }

    pub fn handle(&self, key: &ReferenceKey) -> Option<RecordHandle> {
        self.by_key.get(key).copied()
    }

    pub fn lookup(&self, key: &ReferenceKey) -> Option<&Record> {
        self.handle(key).and_then(|h| self.get(h))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Resolves references on behalf of the field-mapping layer's path evaluator.
pub trait ReferenceResolver {
    fn resolve(&self, key: &ReferenceKey) -> Option<&Record>;

    /// Resolve a raw reference string; unparseable references resolve to nothing.
    fn resolve_str(&self, reference: &str) -> Option<&Record> {
        ReferenceKey::parse(reference)
            .ok()
            .and_then(|key| self.resolve(&key))
    }
}

impl ReferenceResolver for ReferenceIndex {
    fn resolve(&self, key: &ReferenceKey) -> Option<&Record> {
        self.lookup(key)
    }
}

//! Per-subject record trees.
//!
//! A search page delivers a flat list of resources that point at each other by reference:
//! conditions, observations and specimens name their subject, clinical impressions name both a
//! subject and the condition they assess. [`ReferenceGraphBuilder`] folds such a batch into a
//! [`RootTree`]:
//!
//! ```text
//! RootTree
//!   subjects: [SubjectNode]          (one per Patient record, first-seen order)
//!     vital_status: Observation?
//!     conditions: [ConditionNode]
//!       impressions: [ImpressionNode]
//!     specimens: [Specimen]
//!   index: ReferenceIndex            (every record of the batch, by "<Type>/<id>")
//! ```
//!
//! Nodes hold [`RecordHandle`]s into the tree's own [`ReferenceIndex`]; the tree is immutable
//! once built.

mod builder;
mod index;

pub use builder::ReferenceGraphBuilder;
pub use index::{RecordHandle, ReferenceIndex, ReferenceResolver};

use fhir::{Record, ReferenceKey};

/// A clinical impression attached to the condition it assesses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImpressionNode {
    impression: RecordHandle,
}

impl ImpressionNode {
    pub fn impression(&self) -> RecordHandle {
        self.impression
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionNode {
    condition: RecordHandle,
    impressions: Vec<ImpressionNode>,
}

impl ConditionNode {
    pub fn condition(&self) -> RecordHandle {
        self.condition
    }

    pub fn impressions(&self) -> &[ImpressionNode] {
        &self.impressions
    }
}

/// Everything the batch holds for one patient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectNode {
    patient: RecordHandle,
    vital_status: Option<RecordHandle>,
    conditions: Vec<ConditionNode>,
    specimens: Vec<RecordHandle>,
}

impl SubjectNode {
    pub fn patient(&self) -> RecordHandle {
        self.patient
    }

    pub fn vital_status(&self) -> Option<RecordHandle> {
        self.vital_status
    }

    pub fn conditions(&self) -> &[ConditionNode] {
        &self.conditions
    }

    pub fn specimens(&self) -> &[RecordHandle] {
        &self.specimens
    }
}

/// Finished, immutable result of one build.
#[derive(Clone, Debug, Default)]
pub struct RootTree {
    subjects: Vec<SubjectNode>,
    index: ReferenceIndex,
}

impl RootTree {
    pub fn subjects(&self) -> &[SubjectNode] {
        &self.subjects
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    pub fn record(&self, handle: RecordHandle) -> Option<&Record> {
        self.index.get(handle)
    }

    /// Key of the record behind `handle`.
    pub fn key(&self, handle: RecordHandle) -> Option<ReferenceKey> {
        self.record(handle).map(Record::key)
    }
}

impl ReferenceResolver for RootTree {
    fn resolve(&self, key: &ReferenceKey) -> Option<&Record> {
        self.index.lookup(key)
    }
}

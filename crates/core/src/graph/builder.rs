//! Single-pass assembly of a [`RootTree`] from a flat batch of records.

use super::{ConditionNode, ImpressionNode, RecordHandle, ReferenceIndex, RootTree, SubjectNode};
use crate::constants::{CODE_FIELD, PROBLEM_FIELD, SUBJECT_FIELD, VITAL_STATUS_CODES};
use fhir::{Record, ReferenceKey, ResourceType};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Groups one page of records under the patients they belong to.
pub struct ReferenceGraphBuilder;

impl ReferenceGraphBuilder {
    /// Fold `records` into a [`RootTree`] in one forward pass.
    ///
    /// Placement by type:
    /// - `Patient` opens (or completes) the subject keyed by its own key.
    /// - `Condition` goes under its subject.
    /// - `Observation` fills the subject's vital-status slot when it carries a vital-status
    ///   code; other observations are only indexed.
    /// - `Specimen` is appended to its subject's specimens.
    /// - `ClinicalImpression` goes under the condition named by its first `problem` reference,
    ///   within its subject.
    /// - Anything else is only indexed.
    ///
    /// References may point forward in the batch, so nodes are opened on first mention and
    /// only kept if their own record turns up. A subject or condition whose record never
    /// appears is dropped together with everything hung beneath it. Nothing here fails: records
    /// that cannot be placed are still reachable through the index.
    ///
    /// A key seen twice keeps only its last copy, both in the index and in the tree: if the
    /// later copy names another subject (or no longer qualifies for its slot) the earlier
    /// placement is withdrawn.
    pub fn build<I>(records: I) -> RootTree
    where
        I: IntoIterator<Item = Record>,
    {
        let mut index = ReferenceIndex::new();
        let mut subjects: IndexMap<ReferenceKey, SubjectScratch> = IndexMap::new();
        // Where each non-patient key currently hangs. A repeated key moves, it is never copied.
        let mut placed: HashMap<ReferenceKey, Placement> = HashMap::new();

        for record in records {
            let key = record.key();
            let placement = Placement::of(&record);
            let handle = index.insert(record);

            if record_is_patient(&key) {
                subjects.entry(key).or_default().patient = Some(handle);
                continue;
            }

            let previous = match &placement {
                Some(p) => placed.insert(key.clone(), p.clone()),
                None => placed.remove(&key),
            };
            if previous != placement {
                if let Some(previous) = previous {
                    previous.detach(&mut subjects, &key, handle);
                }
            }
            if let Some(placement) = placement {
                placement.attach(&mut subjects, key, handle);
            }
        }

        let subjects: Vec<SubjectNode> = subjects
            .into_values()
            .filter_map(SubjectScratch::finish)
            .collect();

        tracing::debug!(
            subjects = subjects.len(),
            records = index.len(),
            "built subject tree"
        );

        RootTree { subjects, index }
    }
}

fn record_is_patient(key: &ReferenceKey) -> bool {
    key.resource_type() == &ResourceType::Patient
}

/// Slot a non-patient record occupies in the tree, keyed by the subject it names.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Placement {
    Condition { subject: ReferenceKey },
    VitalStatus { subject: ReferenceKey },
    Specimen { subject: ReferenceKey },
    Impression { subject: ReferenceKey, problem: ReferenceKey },
}

impl Placement {
    fn of(record: &Record) -> Option<Self> {
        let subject = subject_of(record)?;
        match record.resource_type() {
            ResourceType::Condition => Some(Placement::Condition { subject }),
            ResourceType::Observation if record.has_code(CODE_FIELD, VITAL_STATUS_CODES) => {
                Some(Placement::VitalStatus { subject })
            }
            ResourceType::Specimen => Some(Placement::Specimen { subject }),
            ResourceType::ClinicalImpression => problem_of(record)
                .map(|problem| Placement::Impression { subject, problem }),
            _ => None,
        }
    }

    fn attach(
        self,
        subjects: &mut IndexMap<ReferenceKey, SubjectScratch>,
        key: ReferenceKey,
        handle: RecordHandle,
    ) {
        match self {
            Placement::Condition { subject } => {
                subjects
                    .entry(subject)
                    .or_default()
                    .conditions
                    .entry(key)
                    .or_default()
                    .condition = Some(handle);
            }
            Placement::VitalStatus { subject } => {
                subjects.entry(subject).or_default().vital_status = Some(handle);
            }
            Placement::Specimen { subject } => {
                subjects
                    .entry(subject)
                    .or_default()
                    .specimens
                    .insert(key, handle);
            }
            Placement::Impression { subject, problem } => {
                subjects
                    .entry(subject)
                    .or_default()
                    .conditions
                    .entry(problem)
                    .or_default()
                    .impressions
                    .insert(key, handle);
            }
        }
    }

    /// Undo an earlier [`Placement::attach`] of `key`. Impressions already hung under a
    /// detached condition stay with it and are dropped if it never regains its record.
    fn detach(
        self,
        subjects: &mut IndexMap<ReferenceKey, SubjectScratch>,
        key: &ReferenceKey,
        handle: RecordHandle,
    ) {
        match self {
            Placement::Condition { subject } => {
                if let Some(condition) = subjects
                    .get_mut(&subject)
                    .and_then(|s| s.conditions.get_mut(key))
                {
                    condition.condition = None;
                }
            }
            Placement::VitalStatus { subject } => {
                if let Some(scratch) = subjects.get_mut(&subject) {
                    if scratch.vital_status == Some(handle) {
                        scratch.vital_status = None;
                    }
                }
            }
            Placement::Specimen { subject } => {
                if let Some(scratch) = subjects.get_mut(&subject) {
                    scratch.specimens.shift_remove(key);
                }
            }
            Placement::Impression { subject, problem } => {
                if let Some(condition) = subjects
                    .get_mut(&subject)
                    .and_then(|s| s.conditions.get_mut(&problem))
                {
                    condition.impressions.shift_remove(key);
                }
            }
        }
    }
}

/// The Patient a record belongs to, if its subject reference names one.
fn subject_of(record: &Record) -> Option<ReferenceKey> {
    record
        .reference(SUBJECT_FIELD)
        .filter(|key| key.resource_type() == &ResourceType::Patient)
}

/// The Condition a clinical impression assesses (first `problem` reference only).
fn problem_of(record: &Record) -> Option<ReferenceKey> {
    if record.resource_type() != &ResourceType::ClinicalImpression {
        return None;
    }
    record
        .reference(PROBLEM_FIELD)
        .filter(|key| key.resource_type() == &ResourceType::Condition)
}

// ============================================================================
// Scratch accumulators (local to one build)
// ============================================================================

#[derive(Default)]
struct SubjectScratch {
    patient: Option<RecordHandle>,
    vital_status: Option<RecordHandle>,
    conditions: IndexMap<ReferenceKey, ConditionScratch>,
    specimens: IndexMap<ReferenceKey, RecordHandle>,
}

impl SubjectScratch {
    fn finish(self) -> Option<SubjectNode> {
        let patient = self.patient?;
        Some(SubjectNode {
            patient,
            vital_status: self.vital_status,
            conditions: self
                .conditions
                .into_values()
                .filter_map(ConditionScratch::finish)
                .collect(),
            specimens: self.specimens.into_values().collect(),
        })
    }
}

#[derive(Default)]
struct ConditionScratch {
    condition: Option<RecordHandle>,
    impressions: IndexMap<ReferenceKey, RecordHandle>,
}

impl ConditionScratch {
    fn finish(self) -> Option<ConditionNode> {
        let condition = self.condition?;
        Some(ConditionNode {
            condition,
            impressions: self
                .impressions
                .into_values()
                .map(|impression| ImpressionNode { impression })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ReferenceResolver;
    use serde_json::{json, Value};

    fn record(body: Value) -> Record {
        Record::from_value(body).expect("valid record")
    }

    fn patient(id: &str) -> Record {
        record(json!({ "resourceType": "Patient", "id": id }))
    }

    fn condition(id: &str, subject: &str) -> Record {
        record(json!({
            "resourceType": "Condition",
            "id": id,
            "subject": { "reference": subject }
        }))
    }

    fn impression(id: &str, subject: &str, problem: &str) -> Record {
        record(json!({
            "resourceType": "ClinicalImpression",
            "id": id,
            "subject": { "reference": subject },
            "problem": [ { "reference": problem } ]
        }))
    }

    fn observation(id: &str, subject: &str, code: &str) -> Record {
        record(json!({
            "resourceType": "Observation",
            "id": id,
            "subject": { "reference": subject },
            "code": { "coding": [ { "system": "http://loinc.org", "code": code } ] }
        }))
    }

    fn specimen(id: &str, subject: &str) -> Record {
        record(json!({
            "resourceType": "Specimen",
            "id": id,
            "subject": { "reference": subject }
        }))
    }

    fn keys(tree: &RootTree, handles: impl IntoIterator<Item = RecordHandle>) -> Vec<String> {
        handles
            .into_iter()
            .map(|h| tree.key(h).expect("handle from this tree").to_string())
            .collect()
    }

    #[test]
    fn empty_batch_builds_empty_tree() {
        let tree = ReferenceGraphBuilder::build(Vec::new());
        assert!(tree.subjects().is_empty());
        assert!(tree.index().is_empty());
    }

    #[test]
    fn places_every_linked_record_exactly_once() {
        let batch = vec![
            patient("p1"),
            condition("c1", "Patient/p1"),
            impression("ci1", "Patient/p1", "Condition/c1"),
            observation("vs1", "Patient/p1", "75186-7"),
            specimen("s1", "Patient/p1"),
            patient("p2"),
            condition("c2", "Patient/p2"),
            condition("c3", "Patient/p2"),
            specimen("s2", "Patient/p2"),
            specimen("s3", "Patient/p2"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);

        assert_eq!(tree.subjects().len(), 2);
        assert_eq!(tree.index().len(), 10);

        let p1 = &tree.subjects()[0];
        assert_eq!(keys(&tree, [p1.patient()]), ["Patient/p1"]);
        assert_eq!(keys(&tree, p1.vital_status()), ["Observation/vs1"]);
        assert_eq!(p1.conditions().len(), 1);
        assert_eq!(keys(&tree, [p1.conditions()[0].condition()]), ["Condition/c1"]);
        assert_eq!(
            keys(&tree, p1.conditions()[0].impressions().iter().map(|i| i.impression())),
            ["ClinicalImpression/ci1"]
        );
        assert_eq!(keys(&tree, p1.specimens().iter().copied()), ["Specimen/s1"]);

        let p2 = &tree.subjects()[1];
        assert!(p2.vital_status().is_none());
        assert_eq!(
            keys(&tree, p2.conditions().iter().map(|c| c.condition())),
            ["Condition/c2", "Condition/c3"]
        );
        assert_eq!(
            keys(&tree, p2.specimens().iter().copied()),
            ["Specimen/s2", "Specimen/s3"]
        );
    }

    #[test]
    fn forward_references_resolve_later_in_the_batch() {
        let batch = vec![
            impression("ci1", "Patient/p1", "Condition/c1"),
            condition("c1", "Patient/p1"),
            specimen("s1", "Patient/p1"),
            patient("p1"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);

        assert_eq!(tree.subjects().len(), 1);
        let subject = &tree.subjects()[0];
        assert_eq!(subject.conditions().len(), 1);
        assert_eq!(subject.conditions()[0].impressions().len(), 1);
        assert_eq!(subject.specimens().len(), 1);
    }

    #[test]
    fn dangling_subject_is_dropped_but_indexed() {
        let batch = vec![
            patient("p1"),
            condition("c9", "Patient/missing"),
            specimen("s9", "Patient/missing"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);

        assert_eq!(tree.subjects().len(), 1);
        assert!(tree.subjects()[0].conditions().is_empty());
        assert!(tree.subjects()[0].specimens().is_empty());
        assert!(tree.resolve_str("Condition/c9").is_some());
        assert!(tree.resolve_str("Specimen/s9").is_some());
    }

    #[test]
    fn impression_without_its_condition_is_dropped() {
        let batch = vec![
            patient("p1"),
            impression("ci1", "Patient/p1", "Condition/absent"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);

        assert!(tree.subjects()[0].conditions().is_empty());
        assert!(tree.resolve_str("ClinicalImpression/ci1").is_some());
    }

    #[test]
    fn impression_attaches_within_its_own_subject() {
        let batch = vec![
            patient("p1"),
            patient("p2"),
            condition("c1", "Patient/p1"),
            // Names p2 as subject, so it cannot land under p1's condition.
            impression("ci1", "Patient/p2", "Condition/c1"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);

        assert_eq!(tree.subjects()[0].conditions()[0].impressions().len(), 0);
        assert!(tree.subjects()[1].conditions().is_empty());
    }

    #[test]
    fn non_vital_observations_and_other_types_are_only_indexed() {
        let batch = vec![
            patient("p1"),
            observation("hr", "Patient/p1", "8867-4"),
            record(json!({
                "resourceType": "Encounter",
                "id": "e1",
                "subject": { "reference": "Patient/p1" }
            })),
        ];
        let tree = ReferenceGraphBuilder::build(batch);

        let subject = &tree.subjects()[0];
        assert!(subject.vital_status().is_none());
        assert!(subject.conditions().is_empty());
        assert!(subject.specimens().is_empty());
        assert_eq!(tree.index().len(), 3);
        assert!(tree.resolve_str("Observation/hr").is_some());
        assert!(tree.resolve_str("Encounter/e1").is_some());
    }

    #[test]
    fn non_patient_subjects_are_ignored() {
        let batch = vec![
            record(json!({ "resourceType": "Group", "id": "g1" })),
            specimen("s1", "Group/g1"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);
        assert!(tree.subjects().is_empty());
        assert_eq!(tree.index().len(), 2);
    }

    #[test]
    fn duplicate_records_do_not_duplicate_nodes() {
        let batch = vec![
            patient("p1"),
            condition("c1", "Patient/p1"),
            condition("c1", "Patient/p1"),
            specimen("s1", "Patient/p1"),
            specimen("s1", "Patient/p1"),
            patient("p1"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);

        assert_eq!(tree.subjects().len(), 1);
        assert_eq!(tree.subjects()[0].conditions().len(), 1);
        assert_eq!(tree.subjects()[0].specimens().len(), 1);
        assert_eq!(tree.index().len(), 3);
    }

    #[test]
    fn later_vital_status_observation_wins() {
        let batch = vec![
            patient("p1"),
            observation("vs1", "Patient/p1", "75186-7"),
            observation("vs2", "Patient/p1", "75186-7"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);
        assert_eq!(
            keys(&tree, tree.subjects()[0].vital_status()),
            ["Observation/vs2"]
        );
    }

    #[test]
    fn repeated_condition_moves_to_its_latest_subject() {
        let batch = vec![
            patient("p1"),
            patient("p2"),
            condition("c1", "Patient/p1"),
            condition("c1", "Patient/p2"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);

        assert!(tree.subjects()[0].conditions().is_empty());
        let p2 = &tree.subjects()[1];
        assert_eq!(keys(&tree, p2.conditions().iter().map(|c| c.condition())), ["Condition/c1"]);
        let placed = tree.record(p2.conditions()[0].condition()).expect("condition record");
        assert_eq!(
            placed.reference("subject").map(|k| k.to_string()).as_deref(),
            Some("Patient/p2")
        );
    }

    #[test]
    fn repeated_specimen_and_impression_follow_the_last_copy() {
        let batch = vec![
            patient("p1"),
            patient("p2"),
            condition("c1", "Patient/p1"),
            condition("c2", "Patient/p2"),
            specimen("s1", "Patient/p1"),
            impression("ci1", "Patient/p1", "Condition/c1"),
            specimen("s1", "Patient/p2"),
            impression("ci1", "Patient/p2", "Condition/c2"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);

        let (p1, p2) = (&tree.subjects()[0], &tree.subjects()[1]);
        assert!(p1.specimens().is_empty());
        assert!(p1.conditions()[0].impressions().is_empty());
        assert_eq!(keys(&tree, p2.specimens().iter().copied()), ["Specimen/s1"]);
        assert_eq!(
            keys(&tree, p2.conditions()[0].impressions().iter().map(|i| i.impression())),
            ["ClinicalImpression/ci1"]
        );
    }

    #[test]
    fn vital_status_is_withdrawn_when_the_later_copy_loses_its_code() {
        let batch = vec![
            patient("p1"),
            observation("vs1", "Patient/p1", "75186-7"),
            observation("vs1", "Patient/p1", "8867-4"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);

        assert!(tree.subjects()[0].vital_status().is_none());
        assert!(tree.resolve_str("Observation/vs1").is_some());
    }

    #[test]
    fn same_subject_repeat_keeps_first_seen_position() {
        let batch = vec![
            patient("p1"),
            specimen("s1", "Patient/p1"),
            specimen("s2", "Patient/p1"),
            specimen("s1", "Patient/p1"),
        ];
        let tree = ReferenceGraphBuilder::build(batch);
        assert_eq!(
            keys(&tree, tree.subjects()[0].specimens().iter().copied()),
            ["Specimen/s1", "Specimen/s2"]
        );
    }
}

//! Flatten a [`RootTree`] into reference keys for the wire.

use api_shared::{ConditionSummary, SubjectSummary};
use cohort_core::{RecordHandle, RootTree};

fn key_of(tree: &RootTree, handle: RecordHandle) -> String {
    tree.key(handle)
        .map(|key| key.to_string())
        .unwrap_or_default()
}

pub fn summarise_subjects(tree: &RootTree) -> Vec<SubjectSummary> {
    tree.subjects()
        .iter()
        .map(|subject| SubjectSummary {
            patient: key_of(tree, subject.patient()),
            vital_status: subject.vital_status().map(|h| key_of(tree, h)),
            conditions: subject
                .conditions()
                .iter()
                .map(|condition| ConditionSummary {
                    condition: key_of(tree, condition.condition()),
                    impressions: condition
                        .impressions()
                        .iter()
                        .map(|i| key_of(tree, i.impression()))
                        .collect(),
                })
                .collect(),
            specimens: subject
                .specimens()
                .iter()
                .map(|&h| key_of(tree, h))
                .collect(),
        })
        .collect()
}

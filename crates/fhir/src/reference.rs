//! Resource type tags and canonical reference keys.
//!
//! A reference key is the string `"<Type>/<id>"`. It is the only addressing scheme used for
//! records: subject trees resolve parents through it and the reference index is keyed by it.
//! [`ReferenceKey`]'s `Display` and [`ReferenceKey::parse`] are the single producer and parser
//! of that format.

use crate::{FhirError, FhirResult};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Resource type
// ============================================================================

/// The resource types the cohort core distinguishes.
///
/// Anything else is carried through verbatim as [`ResourceType::Other`] so it can still be
/// indexed and resolved by key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Patient,
    Condition,
    Observation,
    Specimen,
    ClinicalImpression,
    Other(String),
}

impl ResourceType {
    /// Classify a `resourceType` string. Never fails.
    pub fn parse(s: &str) -> Self {
        match s {
            "Patient" => ResourceType::Patient,
            "Condition" => ResourceType::Condition,
            "Observation" => ResourceType::Observation,
            "Specimen" => ResourceType::Specimen,
            "ClinicalImpression" => ResourceType::ClinicalImpression,
            other => ResourceType::Other(other.to_owned()),
        }
    }

    /// Wire name of the type.
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Condition => "Condition",
            ResourceType::Observation => "Observation",
            ResourceType::Specimen => "Specimen",
            ResourceType::ClinicalImpression => "ClinicalImpression",
            ResourceType::Other(name) => name,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Reference key
// ============================================================================

/// Canonical `"<Type>/<id>"` address of a record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceKey {
    resource_type: ResourceType,
    id: String,
}

impl ReferenceKey {
    /// Build a key from an already classified type and an id.
    pub fn new(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self {
            resource_type,
            id: id.into(),
        }
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parse a reference string into its canonical key.
    ///
    /// Accepts `Type/id`, and also absolute URLs or versioned references whose path contains a
    /// `Type/id` pair, for example `https://fhir.example/fhir/Patient/p1/_history/3`. The pair
    /// that ends the path (or precedes `_history`) is used.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidReference`] if:
    /// - the reference is empty or a contained reference (`#...`),
    /// - no `Type/id` pair can be found,
    /// - the type segment does not start with an uppercase ASCII letter.
    pub fn parse(reference: &str) -> FhirResult<Self> {
        let trimmed = reference.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Err(FhirError::InvalidReference(format!(
                "'{reference}' is not a resolvable reference"
            )));
        }

        let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
        let mut segments: Vec<&str> = without_query
            .trim_end_matches('/')
            .split('/')
            .collect();

        if let Some(pos) = segments.iter().position(|s| *s == "_history") {
            segments.truncate(pos);
        }

        let (type_segment, id_segment) = match segments.as_slice() {
            [.., t, id] => (*t, *id),
            _ => {
                return Err(FhirError::InvalidReference(format!(
                    "'{reference}' does not contain a Type/id pair"
                )))
            }
        };

        let type_ok = type_segment
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
            && type_segment.chars().all(|c| c.is_ascii_alphanumeric());
        if !type_ok || id_segment.is_empty() {
            return Err(FhirError::InvalidReference(format!(
                "'{reference}' does not contain a Type/id pair"
            )));
        }

        Ok(Self::new(ResourceType::parse(type_segment), id_segment))
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

impl FromStr for ReferenceKey {
    type Err = FhirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferenceKey::parse(s)
    }
}

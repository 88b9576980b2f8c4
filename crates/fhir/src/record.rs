//! Opaque clinical records.
//!
//! A [`Record`] is a single resource as delivered in a search page. The cohort core only looks at
//! its type, its id and a handful of reference/coding fields; the full JSON body is kept so the
//! field-mapping layer can read anything else through its own path evaluator.

use crate::reference::{ReferenceKey, ResourceType};
use crate::{FhirError, FhirResult};
use serde_json::Value;

/// One `system`/`code` pair from a CodeableConcept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coding {
    pub system: Option<String>,
    pub code: Option<String>,
}

/// A typed clinical resource with its raw JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    resource_type: ResourceType,
    id: String,
    body: Value,
}

impl Record {
    /// Wrap a resource JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidInput`] if the value is not an object or lacks a string
    /// `resourceType` or a non-empty string `id`.
    pub fn from_value(body: Value) -> FhirResult<Self> {
        let obj = body
            .as_object()
            .ok_or_else(|| FhirError::InvalidInput("resource must be a JSON object".into()))?;

        let resource_type = obj
            .get("resourceType")
            .and_then(Value::as_str)
            .map(ResourceType::parse)
            .ok_or_else(|| FhirError::InvalidInput("resource is missing resourceType".into()))?;

        let id = obj
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                FhirError::InvalidInput(format!("{resource_type} resource is missing id"))
            })?
            .to_owned();

        Ok(Self {
            resource_type,
            id,
            body,
        })
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The record's own `"<Type>/<id>"` key.
    pub fn key(&self) -> ReferenceKey {
        ReferenceKey::new(self.resource_type.clone(), self.id.clone())
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// First resolvable `Reference` held in `field`.
    ///
    /// `field` may hold a single Reference object or an array of them; unparseable references
    /// are skipped.
    pub fn reference(&self, field: &str) -> Option<ReferenceKey> {
        self.references(field).into_iter().next()
    }

    /// All resolvable references held in `field`, in document order.
    pub fn references(&self, field: &str) -> Vec<ReferenceKey> {
        fn parse_one(value: &Value) -> Option<ReferenceKey> {
            value
                .get("reference")
                .and_then(Value::as_str)
                .and_then(|r| ReferenceKey::parse(r).ok())
        }

        match self.body.get(field) {
            Some(Value::Array(items)) => items.iter().filter_map(parse_one).collect(),
            Some(value) => parse_one(value).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Codings of the CodeableConcept(s) held in `field`.
    pub fn codings(&self, field: &str) -> Vec<Coding> {
        fn collect(concept: &Value, out: &mut Vec<Coding>) {
            let Some(codings) = concept.get("coding").and_then(Value::as_array) else {
                return;
            };
            out.extend(codings.iter().map(|c| Coding {
                system: c.get("system").and_then(Value::as_str).map(str::to_owned),
                code: c.get("code").and_then(Value::as_str).map(str::to_owned),
            }));
        }

        let mut out = Vec::new();
        match self.body.get(field) {
            Some(Value::Array(concepts)) => concepts.iter().for_each(|c| collect(c, &mut out)),
            Some(concept) => collect(concept, &mut out),
            None => {}
        }
        out
    }

    /// True if any coding in `field` carries one of `codes`.
    pub fn has_code(&self, field: &str, codes: &[&str]) -> bool {
        self.codings(field)
            .iter()
            .filter_map(|c| c.code.as_deref())
            .any(|code| codes.contains(&code))
    }
}

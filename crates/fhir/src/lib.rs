//! FHIR wire/boundary support for cohort retrieval.
//!
//! This crate provides the **wire models** the cohort core consumes:
//! - resource type tags and the canonical `"<Type>/<id>"` reference key
//! - an opaque [`Record`] carrying a resource's type, id and JSON body
//! - searchset Bundle parsing into a [`BundlePage`] (total, self/next links, records)
//!
//! This crate focuses on:
//! - serialisation/deserialisation of search pages
//! - producing and parsing reference keys identically everywhere
//!
//! It deliberately knows nothing about caching, pagination state or subject trees; those live in
//! `cohort-core`. Record field contents are read only through the small accessor surface on
//! [`Record`].

pub mod bundle;
pub mod record;
pub mod reference;

// Re-export facades
pub use bundle::{Bundle, BundlePage};
pub use record::{Coding, Record};
pub use reference::{ReferenceKey, ResourceType};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

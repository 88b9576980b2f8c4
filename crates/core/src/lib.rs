//! # Cohort Core
//!
//! Core logic for serving a cohort of linked clinical records page by page.
//!
//! This crate contains:
//! - the failure channel shared by every operation ([`Failure`], [`CohortResult`])
//! - subject-tree assembly from a flat batch of records ([`ReferenceGraphBuilder`])
//! - the process-wide result cache of discovered page addresses ([`ResultCache`])
//! - forward-only page walking with memoised discovery ([`PageSequencer`])
//! - the [`CohortService`] facade used by the API layers
//!
//! **No API concerns**: HTTP servers, status codes and request parsing belong in `api-rest`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod graph;
pub mod sequencer;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{ResultCache, ResultEntry};
pub use config::CoreConfig;
pub use error::{CohortResult, ConfigError, ConfigResult, Failure, FailureKind};
pub use fetch::{HttpPageFetcher, PageFetcher};
pub use graph::{
    ConditionNode, ImpressionNode, RecordHandle, ReferenceGraphBuilder, ReferenceIndex,
    ReferenceResolver, RootTree, SubjectNode,
};
pub use sequencer::PageSequencer;
pub use service::{number_of_pages, CohortService, ResultStats};

pub use cohort_uuid::ResultId;
pub use fhir::{BundlePage, Record, ReferenceKey, ResourceType};

//! Constants used throughout the cohort core crate.

/// FHIR server base used when no source URL is configured.
pub const DEFAULT_SOURCE_BASE_URL: &str = "http://localhost:8080/fhir/";

/// Records per page assumed when computing page counts.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Per-request timeout for page fetches, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Media type requested from the FHIR server.
pub const FHIR_JSON_MEDIA_TYPE: &str = "application/fhir+json";

/// Observation codes that mark a subject's vital-status observation (LOINC "Vital status").
pub const VITAL_STATUS_CODES: &[&str] = &["75186-7"];

/// Reference field naming the owning subject of a clinical record.
pub const SUBJECT_FIELD: &str = "subject";

/// Reference field of a ClinicalImpression naming the condition it assesses.
pub const PROBLEM_FIELD: &str = "problem";

/// CodeableConcept field inspected on Observations.
pub const CODE_FIELD: &str = "code";

//! Failure channel shared by every fallible cohort operation.
//!
//! Operations return [`CohortResult<T>`], a plain `Result` whose error side is the closed,
//! two-case [`Failure`] classification:
//!
//! - [`Failure::NotFound`]: expected absence (unknown result id, page past the end of the
//!   chain, first page without a self link).
//! - [`Failure::Fault`]: unexpected failure (transport error, non-success upstream status,
//!   malformed page).
//!
//! Callers pick a response class by inspecting [`Failure::kind`], never by downcasting.
//! The usual `Result` combinators cover chaining: `map`, `and_then` (short-circuits on an
//! existing failure), `map_err`, `unwrap_or_else`, `or_else`, and `?` to exit early.

use fhir::FhirError;

/// Classification of a [`Failure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotFound,
    Fault,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("fault: {0}")]
    Fault(String),
}

impl Failure {
    pub fn not_found(message: impl Into<String>) -> Self {
        Failure::NotFound(message.into())
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Failure::Fault(message.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::NotFound(_) => FailureKind::NotFound,
            Failure::Fault(_) => FailureKind::Fault,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == FailureKind::NotFound
    }

    pub fn is_fault(&self) -> bool {
        self.kind() == FailureKind::Fault
    }

    /// Human-readable detail without the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            Failure::NotFound(msg) | Failure::Fault(msg) => msg,
        }
    }
}

impl From<FhirError> for Failure {
    fn from(err: FhirError) -> Self {
        Failure::Fault(err.to_string())
    }
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        Failure::Fault(err.to_string())
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Failure::Fault(err.to_string())
    }
}

pub type CohortResult<T> = std::result::Result<T, Failure>;

/// Errors raised while resolving [`crate::CoreConfig`] at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid source URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn half(n: u64) -> CohortResult<u64> {
        if n % 2 == 0 {
            Ok(n / 2)
        } else {
            Err(Failure::fault(format!("{n} is odd")))
        }
    }

    #[test]
    fn kind_classifies_both_cases() {
        let missing = Failure::not_found("page 3 of result abc");
        assert_eq!(missing.kind(), FailureKind::NotFound);
        assert!(missing.is_not_found());
        assert!(!missing.is_fault());
        assert_eq!(missing.message(), "page 3 of result abc");
        assert_eq!(missing.to_string(), "not found: page 3 of result abc");

        let fault = Failure::fault("connection reset");
        assert_eq!(fault.kind(), FailureKind::Fault);
        assert!(fault.is_fault());
    }

    #[test]
    fn and_then_short_circuits_on_failure() {
        let ok: CohortResult<u64> = Ok(8);
        assert_eq!(ok.and_then(half).and_then(half), Ok(2));

        let failed: CohortResult<u64> = Err(Failure::not_found("result"));
        let chained = failed.and_then(half).map(|n| n + 1);
        assert_eq!(chained, Err(Failure::not_found("result")));

        // The failure from the middle step is the one surfaced.
        assert_eq!(
            Ok(6).and_then(half).and_then(half),
            Err(Failure::fault("3 is odd"))
        );
    }

    #[test]
    fn map_err_and_or_else_transform_failures() {
        let failed: CohortResult<u64> = Err(Failure::fault("boom"));
        let relabelled = failed
            .clone()
            .map_err(|f| Failure::not_found(format!("wrapped {}", f.message())));
        assert_eq!(relabelled, Err(Failure::not_found("wrapped boom")));

        let recovered = failed.clone().or_else(|_| half(4));
        assert_eq!(recovered, Ok(2));
        assert_eq!(failed.unwrap_or_else(|_| 0), 0);
    }

    #[test]
    fn boundary_errors_are_faults() {
        let fhir_err = FhirError::InvalidInput("Expected resourceType 'Bundle'".into());
        assert!(Failure::from(fhir_err).is_fault());

        let json_err = serde_json::from_str::<serde_json::Value>("{").expect_err("bad json");
        assert!(Failure::from(json_err).is_fault());
    }
}

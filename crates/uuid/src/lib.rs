//! Opaque identifiers for cached cohort results.
//!
//! Every cohort query that produces a first page is registered in the result cache under a
//! freshly generated identifier. Callers only ever see that identifier as a string (for example,
//! in a REST path segment), so the representation is fixed to a *canonical* form:
//! **32 lowercase hexadecimal characters** with no hyphens.
//!
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Identifiers coming back from outside the process are validated with [`ResultId::parse`].
//! Non-canonical values (uppercase, hyphenated, wrong length, non-hex) are rejected rather than
//! normalised, so a single result can never be addressed by two different strings.

mod service;

pub use service::{ResultId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;

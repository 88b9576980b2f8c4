//! # API Shared
//!
//! Shared request/response types for the cohort APIs.
//!
//! Contains:
//! - JSON wire types (`dto` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! Used by `api-rest`.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;

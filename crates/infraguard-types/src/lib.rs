//! Stable DTOs and IDs used across the infraguard workspace.
//!
//! This crate is intentionally boring:
//! - the normalized resource-change input shape
//! - data types for the emitted evaluation report
//! - stable string IDs (schemas, dialects, synthetic addresses)

#![forbid(unsafe_code)]

pub mod ids;
pub mod receipt;
pub mod resource;

pub use receipt::{
    Counts, EvaluationReport, Indeterminate, SCHEMA_REPORT_V1, Severity, Verdict, Violation,
};
pub use resource::{Dialect, ResourceChange};

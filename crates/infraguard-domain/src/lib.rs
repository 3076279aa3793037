//! Pure policy evaluation (no IO).
//!
//! Input: a rule registry and resource changes normalized elsewhere.
//! Output: violations + indeterminates + verdict, sorted deterministically.

#![forbid(unsafe_code)]

pub mod compliance;
pub mod error;
pub mod lint;
pub mod model;
pub mod predicate;
pub mod registry;
pub mod report;
pub mod template;
pub mod units;

mod engine;
mod eval;

#[cfg(test)]
mod proptest;
#[cfg(test)]
mod test_support;

pub use engine::{CancellationToken, EvalOptions, evaluate, evaluate_snapshot};
pub use error::{CancellationError, DefinitionError, PredicateError, ValidationError};
pub use model::Snapshot;
pub use registry::{
    HelperDefinition, Registry, Rule, RuleDefinition, RuleScope, RuleSource, SubjectKind,
};
pub use report::{DomainReport, RunStats};

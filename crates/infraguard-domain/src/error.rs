//! Error taxonomy for the engine.
//!
//! `ValidationError` and `DefinitionError` are fatal and happen before any
//! evaluation. `PredicateError` is scoped to one (rule, resource) pair and is
//! reported as an indeterminate. `CancellationError` marks a truncated run.

use crate::units::UnitError;
use thiserror::Error;

/// Malformed or inconsistent input document.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("document is malformed: {0}")]
    Document(String),

    #[error("entry {index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },

    #[error("duplicate address '{address}' (entries {first} and {second})")]
    DuplicateAddress {
        address: String,
        first: usize,
        second: usize,
    },
}

/// Rule set that cannot be loaded. A registry either loads completely or not at all.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("{what} id must not be empty")]
    EmptyId { what: &'static str },

    #[error("duplicate rule id '{id}'")]
    DuplicateRule { id: String },

    #[error("duplicate helper id '{id}'")]
    DuplicateHelper { id: String },

    #[error("{owner} references undefined helper '{helper}'")]
    UndefinedHelper { owner: String, helper: String },

    #[error("{owner} references helper '{helper}' before it is defined")]
    ForwardHelperReference { owner: String, helper: String },

    #[error("cyclic helper references: {}", .cycle.join(" -> "))]
    CyclicHelper { cycle: Vec<String> },

    #[error("{owner} references unbound variable '{name}'")]
    UnboundVariable { owner: String, name: String },

    #[error("{owner} uses invalid path '{path}': {reason}")]
    InvalidPath {
        owner: String,
        path: String,
        reason: String,
    },

    #[error("{owner} calls helper '{helper}' on a {found} but it expects a {expected}")]
    SubjectMismatch {
        owner: String,
        helper: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{owner} has a malformed predicate: {reason}")]
    MalformedPredicate { owner: String, reason: String },

    #[error("{owner} has an invalid quantity literal: {source}")]
    InvalidQuantity {
        owner: String,
        #[source]
        source: UnitError,
    },

    #[error("rule '{rule}' has an invalid message template: {reason}")]
    InvalidTemplate { rule: String, reason: String },
}

/// Runtime failure while evaluating one predicate against one subject.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PredicateError {
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error("unbound variable '{0}'")]
    Unbound(String),

    #[error("undefined helper '{0}'")]
    UndefinedHelper(String),
}

/// The run was stopped before every unit of work was evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CancellationError {
    #[error("evaluation cancelled by caller")]
    Cancelled,

    #[error("evaluation deadline exceeded")]
    DeadlineExceeded,
}

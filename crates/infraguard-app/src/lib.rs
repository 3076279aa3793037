//! Use case orchestration for infraguard.
//!
//! This crate provides the application layer: use cases that coordinate the settings, normalize,
//! domain, and render layers. It is intentionally thin and delegates heavy lifting to the
//! appropriate layers.
//!
//! The CLI crate depends on this; it only handles argument parsing and I/O.

#![forbid(unsafe_code)]

mod check;
mod lint;
mod render;
mod report;

pub use check::{
    CheckInput, CheckOutput, EXIT_LOAD_ERROR, RulesInput, run_check, verdict_exit_code,
};
pub use lint::{LintInput, LintOutput, format_lint, run_lint};
pub use render::{render_annotations, render_markdown};
pub use report::{parse_report_json, serialize_report, to_renderable};

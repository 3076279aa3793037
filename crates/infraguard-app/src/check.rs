//! The `check` use case: load rules, normalize resources, evaluate, produce a report.

use anyhow::Context;
use infraguard_domain::{CancellationToken, DomainReport, EvalOptions, Registry, RunStats};
use infraguard_settings::{InfraguardConfigV1, Overrides, ResolvedConfig, RuleFormat};
use infraguard_types::{EvaluationReport, Verdict};
use std::time::Instant;
use tracing::{info, warn};

/// Exit code for anything that fails before evaluation starts: config, rules, or resources.
pub const EXIT_LOAD_ERROR: i32 = 2;

/// User-supplied rule text and its syntax.
#[derive(Clone, Copy, Debug)]
pub struct RulesInput<'a> {
    pub text: &'a str,
    pub format: RuleFormat,
}

/// Input for the check use case.
#[derive(Clone, Debug)]
pub struct CheckInput<'a> {
    /// Config file contents (empty string if not found).
    pub config_text: &'a str,
    /// Rule file, loaded after the built-in packs.
    pub rules: Option<RulesInput<'a>>,
    /// Change document in the resolved dialect.
    pub resources_text: &'a str,
    /// CLI overrides.
    pub overrides: Overrides,
    pub cancel: CancellationToken,
}

/// Output from the check use case.
#[derive(Clone, Debug)]
pub struct CheckOutput {
    pub report: EvaluationReport,
    pub stats: RunStats,
    /// The resolved configuration used.
    pub resolved_config: ResolvedConfig,
}

/// Run the check use case: resolve config, load the registry, normalize, evaluate.
pub fn run_check(input: CheckInput<'_>) -> anyhow::Result<CheckOutput> {
    let started = Instant::now();
    let (registry, resolved) = load_registry(input.config_text, input.rules, input.overrides)?;

    let resources =
        infraguard_normalize::normalize_str(input.resources_text, resolved.effective.dialect)
            .context("normalize resources")?;

    let options = EvalOptions {
        cancel: input.cancel,
        deadline: resolved.effective.deadline.map(|d| started + d),
        threads: resolved.effective.threads,
    };

    let DomainReport { report, stats } =
        infraguard_domain::evaluate(&registry, resources, &options)
            .context("validate resource snapshot")?;

    info!(
        verdict = ?report.verdict,
        deny = report.counts.deny,
        warn = report.counts.warn,
        indeterminate = report.counts.indeterminate,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "check finished"
    );

    Ok(CheckOutput {
        report,
        stats,
        resolved_config: resolved,
    })
}

/// Resolve config and load the registry the run (or lint) works against.
pub(crate) fn load_registry(
    config_text: &str,
    rules: Option<RulesInput<'_>>,
    overrides: Overrides,
) -> anyhow::Result<(Registry, ResolvedConfig)> {
    // Parse config (empty is allowed, defaults apply).
    let cfg = if config_text.trim().is_empty() {
        InfraguardConfigV1::default()
    } else {
        infraguard_settings::parse_config_toml(config_text).context("parse config")?
    };

    let resolved = infraguard_settings::resolve_config(cfg, overrides).context("resolve config")?;

    let user = rules
        .map(|r| infraguard_settings::parse_rule_source(r.text, r.format))
        .transpose()
        .context("parse rules")?;

    let source = infraguard_settings::assemble_rule_source(
        &resolved.effective.packs,
        user,
        &resolved.effective.selection,
    )
    .context("assemble rules")?;

    let registry = Registry::load(source).context("load rules")?;
    if registry.is_empty() {
        warn!("no rules selected; pass --rules or --pack to evaluate something");
    }

    Ok((registry, resolved))
}

/// Map verdict to exit code: 0 = pass, 1 = fail, 3 = incomplete.
pub fn verdict_exit_code(verdict: Verdict) -> i32 {
    match verdict {
        Verdict::Pass => 0,
        Verdict::Fail => 1,
        Verdict::Incomplete => 3,
    }
}

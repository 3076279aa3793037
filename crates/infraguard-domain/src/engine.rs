use crate::compliance;
use crate::error::{CancellationError, ValidationError};
use crate::eval::{Env, Evaluator};
use crate::model::Snapshot;
use crate::registry::{Registry, Rule};
use crate::report::{DomainReport, RunStats, aggregate};
use infraguard_types::{Indeterminate, ResourceChange, Violation};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Cooperative cancellation flag shared between the caller and the workers.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, Default)]
pub struct EvalOptions {
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
    /// Worker count; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl EvalOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub(crate) fn interruption(&self) -> Option<CancellationError> {
        if self.cancel.is_cancelled() {
            return Some(CancellationError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancellationError::DeadlineExceeded),
            _ => None,
        }
    }
}

/// Per-worker accumulator; merged once at the join.
#[derive(Debug, Default)]
pub(crate) struct Outcomes {
    pub(crate) violations: Vec<Violation>,
    pub(crate) indeterminates: Vec<Indeterminate>,
    pub(crate) evaluated: usize,
    pub(crate) skipped: usize,
    pub(crate) interrupted: Option<CancellationError>,
}

impl Outcomes {
    pub(crate) fn skip(&mut self, reason: CancellationError) {
        self.skipped += 1;
        self.interrupted = self.interrupted.or(Some(reason));
    }

    fn merge(mut self, other: Outcomes) -> Self {
        self.violations.extend(other.violations);
        self.indeterminates.extend(other.indeterminates);
        self.evaluated += other.evaluated;
        self.skipped += other.skipped;
        self.interrupted = self.interrupted.or(other.interrupted);
        self
    }
}

pub fn evaluate(
    registry: &Registry,
    resources: Vec<ResourceChange>,
    options: &EvalOptions,
) -> Result<DomainReport, ValidationError> {
    let snapshot = Snapshot::new(resources)?;
    Ok(evaluate_snapshot(registry, &snapshot, options))
}

pub fn evaluate_snapshot(
    registry: &Registry,
    snapshot: &Snapshot,
    options: &EvalOptions,
) -> DomainReport {
    let evaluator = Evaluator::new(snapshot, registry);

    let units: Vec<(&Rule, &ResourceChange)> = registry
        .per_resource_rules()
        .flat_map(|rule| {
            snapshot
                .of_kinds(&rule.kinds)
                .into_iter()
                .map(move |resource| (rule, resource))
        })
        .collect();
    debug!(
        units = units.len(),
        resources = snapshot.len(),
        rules = registry.len(),
        "dispatching per-resource units"
    );

    let per_resource = run_units(&units, &evaluator, options);
    // Aggregate rules run after every per-resource unit has joined.
    let aggregates = compliance::run_aggregate(&evaluator, registry, options);
    finish(snapshot, registry, per_resource.merge(aggregates))
}

fn finish(snapshot: &Snapshot, registry: &Registry, outcomes: Outcomes) -> DomainReport {
    if let Some(reason) = outcomes.interrupted {
        warn!(
            %reason,
            evaluated = outcomes.evaluated,
            skipped = outcomes.skipped,
            "evaluation interrupted"
        );
    }

    let stats = RunStats {
        resources: snapshot.len(),
        rules: registry.len(),
        units_evaluated: outcomes.evaluated,
        units_skipped: outcomes.skipped,
        interrupted: outcomes.interrupted,
    };
    let report = aggregate(
        outcomes.violations,
        outcomes.indeterminates,
        outcomes.interrupted.is_some(),
    );

    info!(
        verdict = ?report.verdict,
        deny = report.counts.deny,
        warn = report.counts.warn,
        indeterminate = report.counts.indeterminate,
        "evaluation finished"
    );

    DomainReport { report, stats }
}

fn run_units(
    units: &[(&Rule, &ResourceChange)],
    evaluator: &Evaluator<'_>,
    options: &EvalOptions,
) -> Outcomes {
    if let Some(reason) = options.interruption() {
        let mut outcomes = Outcomes::default();
        for _ in units {
            outcomes.skip(reason);
        }
        return outcomes;
    }

    let work = || {
        units
            .par_iter()
            .fold(Outcomes::default, |mut acc, &(rule, resource)| {
                match options.interruption() {
                    Some(reason) => acc.skip(reason),
                    None => evaluate_unit(evaluator, rule, resource, &mut acc),
                }
                acc
            })
            .reduce(Outcomes::default, Outcomes::merge)
    };

    match options.threads {
        Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(work),
            Err(err) => {
                warn!(%err, threads, "could not build worker pool; using the global pool");
                work()
            }
        },
        None => work(),
    }
}

fn evaluate_unit<'a>(
    evaluator: &Evaluator<'a>,
    rule: &'a Rule,
    resource: &'a ResourceChange,
    acc: &mut Outcomes,
) {
    let mut env = Env::for_subject(resource);
    match evaluator.predicate(&rule.predicate, &mut env) {
        Ok(true) => acc.violations.push(Violation {
            rule_id: rule.id.clone(),
            severity: rule.severity,
            resource_address: resource.address.clone(),
            message: rule.render_message(Some(resource)),
        }),
        Ok(false) => {}
        Err(err) => acc.indeterminates.push(Indeterminate {
            rule_id: rule.id.clone(),
            resource_address: resource.address.clone(),
            reason: err.to_string(),
        }),
    }
    acc.evaluated += 1;
}

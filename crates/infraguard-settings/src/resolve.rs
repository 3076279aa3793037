use crate::{model::InfraguardConfigV1, presets};
use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use infraguard_domain::RuleDefinition;
use infraguard_types::Dialect;
use infraguard_types::ids::SCHEMA_CONFIG_V1;
use std::collections::BTreeSet;
use std::time::Duration;

/// Command-line values; each one wins over the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub dialect: Option<String>,
    /// Replaces the configured packs when non-empty.
    pub packs: Vec<String>,
    pub deadline_ms: Option<u64>,
    pub threads: Option<usize>,
}

/// Which loaded rules take part in a run.
#[derive(Clone, Debug)]
pub struct RuleSelection {
    domains: BTreeSet<String>,
    exclude_patterns: Vec<String>,
    exclude: GlobSet,
}

impl Default for RuleSelection {
    fn default() -> Self {
        Self {
            domains: BTreeSet::new(),
            exclude_patterns: Vec::new(),
            exclude: GlobSet::empty(),
        }
    }
}

impl RuleSelection {
    pub fn new(domains: &[String], exclude_patterns: &[String]) -> anyhow::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude_patterns {
            builder.add(
                Glob::new(pattern)
                    .with_context(|| format!("invalid exclude_rules glob: {pattern}"))?,
            );
        }
        Ok(Self {
            domains: domains.iter().cloned().collect(),
            exclude_patterns: exclude_patterns.to_vec(),
            exclude: builder.build().context("build exclude_rules globs")?,
        })
    }

    pub fn admits(&self, rule: &RuleDefinition) -> bool {
        (self.domains.is_empty() || self.domains.contains(&rule.domain))
            && !self.exclude.is_match(&rule.id)
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }
}

#[derive(Clone, Debug)]
pub struct EffectiveConfig {
    pub dialect: Dialect,
    pub packs: Vec<String>,
    pub selection: RuleSelection,
    pub deadline: Option<Duration>,
    pub threads: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub effective: EffectiveConfig,
}

pub fn resolve_config(
    cfg: InfraguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    if let Some(schema) = cfg.schema.as_deref()
        && schema != SCHEMA_CONFIG_V1
    {
        anyhow::bail!("unsupported config schema: {schema} (expected {SCHEMA_CONFIG_V1})");
    }

    let dialect = match overrides.dialect.as_deref().or(cfg.dialect.as_deref()) {
        Some(d) => d.parse::<Dialect>().context("invalid dialect")?,
        None => Dialect::default(),
    };

    let packs = if overrides.packs.is_empty() {
        cfg.packs
    } else {
        overrides.packs
    };
    let mut seen = BTreeSet::new();
    let mut unique_packs = Vec::with_capacity(packs.len());
    for pack in packs {
        if !presets::is_builtin(&pack) {
            anyhow::bail!(
                "unknown rule pack: {pack} (expected one of {})",
                presets::PACKS.join(", ")
            );
        }
        if seen.insert(pack.clone()) {
            unique_packs.push(pack);
        }
    }

    let selection = RuleSelection::new(&cfg.domains, &cfg.exclude_rules)?;

    let threads = overrides.threads.or(cfg.threads);
    if threads == Some(0) {
        anyhow::bail!("threads must be at least 1");
    }

    let deadline = overrides
        .deadline_ms
        .or(cfg.deadline_ms)
        .map(Duration::from_millis);

    Ok(ResolvedConfig {
        effective: EffectiveConfig {
            dialect,
            packs: unique_packs,
            selection,
            deadline,
            threads,
        },
    })
}

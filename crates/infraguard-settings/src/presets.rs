use crate::resolve::RuleSelection;
use crate::rules::{RuleFormat, parse_rule_source};
use anyhow::Context;
use infraguard_domain::RuleSource;
use infraguard_types::ids::{PACK_ADMISSION, PACK_CLOUD, PACK_COMPLIANCE, PACK_CONTAINER};

const LIBRARY: &str = include_str!("../packs/library.toml");
const CLOUD: &str = include_str!("../packs/cloud.toml");
const CONTAINER: &str = include_str!("../packs/container.toml");
const ADMISSION: &str = include_str!("../packs/admission.toml");
const COMPLIANCE: &str = include_str!("../packs/compliance.toml");

/// Built-in rule packs, in load order.
pub const PACKS: &[&str] = &[PACK_CLOUD, PACK_CONTAINER, PACK_ADMISSION, PACK_COMPLIANCE];

pub fn is_builtin(name: &str) -> bool {
    pack_text(name).is_some()
}

fn pack_text(name: &str) -> Option<&'static str> {
    match name {
        PACK_CLOUD => Some(CLOUD),
        PACK_CONTAINER => Some(CONTAINER),
        PACK_ADMISSION => Some(ADMISSION),
        PACK_COMPLIANCE => Some(COMPLIANCE),
        _ => None,
    }
}

/// The shared `lib.*` helpers every pack builds on.
pub fn library() -> anyhow::Result<RuleSource> {
    parse_rule_source(LIBRARY, RuleFormat::Toml).context("parse built-in helper library")
}

/// One built-in pack, without the helper library.
pub fn builtin_pack(name: &str) -> anyhow::Result<RuleSource> {
    let text = pack_text(name).with_context(|| {
        format!(
            "unknown rule pack: {name} (expected one of {})",
            PACKS.join(", ")
        )
    })?;
    parse_rule_source(text, RuleFormat::Toml)
        .with_context(|| format!("parse built-in rule pack {name}"))
}

/// Helper library, then each pack, then the user's rules; rules outside `selection` are dropped.
///
/// Helpers are never filtered: a dropped rule's helpers may still be called by others.
pub fn assemble_rule_source(
    packs: &[String],
    user: Option<RuleSource>,
    selection: &RuleSelection,
) -> anyhow::Result<RuleSource> {
    let mut source = library()?;
    for name in packs {
        source.extend(builtin_pack(name)?);
    }
    if let Some(user) = user {
        source.extend(user);
    }
    source.rules.retain(|r| selection.admits(r));
    Ok(source)
}

//! Property-based tests for the domain crate.
//!
//! These tests use proptest to verify invariants around:
//! - Report determinism (idempotence, input order independence)
//! - Verdict and counts consistency
//! - Unit table parsing

use crate::engine::{EvalOptions, evaluate};
use crate::registry::{Registry, RuleDefinition};
use crate::test_support::{cpu_limit_rule, flow_log_rule, registry, resource, rule};
use crate::units::{Dimension, parse_quantity};
use infraguard_types::{ResourceChange, Severity, Verdict};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Strategies
// ============================================================================

fn arb_cpu() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        (0u32..10_000).prop_map(|m| json!(format!("{m}m"))),
        (0u32..10).prop_map(|c| json!(c)),
        Just(json!("abc")),
        Just(json!(null)),
    ]
}

/// Resources with unique addresses: one container, bucket, network or flow log per index.
fn arb_resources() -> impl Strategy<Value = Vec<ResourceChange>> {
    prop::collection::vec((0u8..4, arb_cpu(), any::<bool>(), 0u8..4), 0..24).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (kind, cpu, flag, vpc))| match kind {
                0 => resource("container", &format!("c{i}"), json!({"cpu": cpu})),
                1 => resource("storage-bucket", &format!("b{i}"), json!({"encryption": flag})),
                2 => resource("network", &format!("vpc{vpc}-{i}"), json!({})),
                _ => resource(
                    "flow-log",
                    &format!("fl{i}"),
                    json!({"vpc_id": format!("vpc{vpc}-{}", i.saturating_sub(1))}),
                ),
            })
            .collect()
    })
}

fn rules() -> Vec<RuleDefinition> {
    let mut encrypted = rule(
        "storage.bucket_encrypted",
        Severity::Deny,
        json!({"op": "not", "expr": {"op": "truthy", "fields": ["attributes.encryption"]}}),
    );
    encrypted.kinds = vec!["storage-bucket".to_string()];

    let mut crowded = rule(
        "network.too_many_logs",
        Severity::Warn,
        json!({
            "op": "compare",
            "left": {"count": {"over": {"kinds": ["flow-log"]}, "as": "l"}},
            "cmp": "gt",
            "right": {"value": 3}
        }),
    );
    crowded.kinds = vec!["network".to_string()];

    vec![encrypted, crowded, flow_log_rule(), cpu_limit_rule()]
}

fn test_registry() -> Registry {
    registry(vec![], rules())
}

fn report_json(reg: &Registry, resources: Vec<ResourceChange>) -> String {
    let out = evaluate(reg, resources, &EvalOptions::default()).expect("evaluate");
    serde_json::to_string(&out.report).expect("serialize")
}

proptest! {
    /// Evaluating twice yields byte-identical reports.
    #[test]
    fn evaluation_is_idempotent(resources in arb_resources()) {
        let reg = test_registry();
        let first = report_json(&reg, resources.clone());
        let second = report_json(&reg, resources);
        prop_assert_eq!(first, second);
    }

    /// Input order never changes the report.
    #[test]
    fn evaluation_ignores_input_order(
        (resources, shuffled) in arb_resources()
            .prop_flat_map(|r| (Just(r.clone()), Just(r).prop_shuffle()))
    ) {
        let reg = test_registry();
        prop_assert_eq!(report_json(&reg, resources), report_json(&reg, shuffled));
    }

    /// Verdict is fail exactly when a deny violation exists; counts match the lists.
    #[test]
    fn verdict_and_counts_agree_with_violations(resources in arb_resources()) {
        let reg = test_registry();
        let report = evaluate(&reg, resources, &EvalOptions::default())
            .expect("evaluate")
            .report;
        let deny = report.violations.iter().filter(|v| v.severity == Severity::Deny).count();
        let warn = report.violations.len() - deny;
        prop_assert_eq!(report.counts.deny as usize, deny);
        prop_assert_eq!(report.counts.warn as usize, warn);
        prop_assert_eq!(report.counts.indeterminate as usize, report.indeterminates.len());
        prop_assert_eq!(report.verdict == Verdict::Fail, deny > 0);
    }

    /// Worker count does not change the report.
    #[test]
    fn thread_count_does_not_change_report(resources in arb_resources(), threads in 1usize..4) {
        let reg = test_registry();
        let global = report_json(&reg, resources.clone());
        let out = evaluate(&reg, resources, &EvalOptions::default().with_threads(threads))
            .expect("evaluate");
        prop_assert_eq!(global, serde_json::to_string(&out.report).expect("serialize"));
    }

    /// Millicore strings and the equivalent core count agree.
    #[test]
    fn cpu_millicores_match_cores(cores in 0u32..64) {
        let from_cores = parse_quantity(Dimension::Cpu, &cores.to_string()).expect("cores");
        let from_milli = parse_quantity(Dimension::Cpu, &format!("{}m", cores * 1000)).expect("milli");
        prop_assert_eq!(from_cores, from_milli);
    }

    /// Binary memory prefixes are always at least the decimal ones.
    #[test]
    fn binary_prefix_is_not_smaller(n in 1u32..1024, idx in 0usize..4) {
        let (bin, dec) = [("Ki", "k"), ("Mi", "M"), ("Gi", "G"), ("Ti", "T")][idx];
        let b = parse_quantity(Dimension::Memory, &format!("{n}{bin}")).expect("binary");
        let d = parse_quantity(Dimension::Memory, &format!("{n}{dec}")).expect("decimal");
        prop_assert!(b > d);
    }

    /// Arbitrary text never panics the unit parser.
    #[test]
    fn unit_parser_never_panics(text in ".{0,16}") {
        let _ = parse_quantity(Dimension::Duration, &text);
    }
}

#[test]
fn seeded_shuffles_produce_identical_reports() {
    use rand::SeedableRng;
    use rand::seq::SliceRandom;

    let reg = test_registry();
    let resources = vec![
        resource("container", "c1", json!({"cpu": "5000m"})),
        resource("container", "c2", json!({"cpu": "abc"})),
        resource("storage-bucket", "b1", json!({"encryption": false})),
        resource("storage-bucket", "b2", json!({"encryption": "enabled"})),
        resource("network", "vpc1", json!({})),
        resource("network", "vpc2", json!({})),
        resource("flow-log", "fl1", json!({"vpc_id": "vpc1"})),
    ];
    let baseline = report_json(&reg, resources.clone());

    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    for _ in 0..16 {
        let mut shuffled = resources.clone();
        shuffled.shuffle(&mut rng);
        assert_eq!(report_json(&reg, shuffled), baseline);
    }
}

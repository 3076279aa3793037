//! End-to-end CLI integration tests using test fixtures.
//!
//! Each fixture in `tests/fixtures/` contains:
//! - `resources.json`: the change document
//! - `rules.toml` and/or `infraguard.toml` (optional)
//! - `expected.report.json` when the run is expected to produce a report
//!
//! These tests run `infraguard check` against each fixture and verify:
//! 1. Exit code matches expected (0=pass, 1=fail, 2=load error, 3=incomplete)
//! 2. JSON output matches expected

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Wraps the deprecated cargo_bin to centralize the deprecation warning.
#[allow(deprecated)]
fn infraguard_cmd() -> Command {
    Command::cargo_bin("infraguard").expect("infraguard binary not found - run `cargo build` first")
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("infraguard-cli crate should have a parent directory")
        .parent()
        .expect("crates directory should have a parent (repo root)")
        .join("tests")
        .join("fixtures")
}

/// Build `infraguard check` for a fixture; the report goes to `report_path`.
fn check_cmd(fixture: &Path, report_path: &Path) -> Command {
    let mut cmd = infraguard_cmd();
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg(fixture.join("infraguard.toml"))
        .arg("check")
        .arg("--resources")
        .arg(fixture.join("resources.json"))
        .arg("--report-out")
        .arg(report_path);
    let rules = fixture.join("rules.toml");
    if rules.exists() {
        cmd.arg("--rules").arg(rules);
    }
    cmd
}

fn run_check_on_fixture(fixture_name: &str, extra: &[&str]) -> (i32, Value) {
    let fixture = fixtures_dir().join(fixture_name);
    let temp_dir = TempDir::new().expect("create temp dir");
    let report_path = temp_dir.path().join("report.json");

    let output = check_cmd(&fixture, &report_path)
        .args(extra)
        .output()
        .expect("run infraguard");
    let exit_code = output.status.code().unwrap_or(-1);

    let text = std::fs::read_to_string(&report_path).expect("read report");
    let report: Value = serde_json::from_str(&text).expect("parse report JSON");
    (exit_code, report)
}

fn load_expected_report(fixture_name: &str) -> Value {
    let path = fixtures_dir()
        .join(fixture_name)
        .join("expected.report.json");
    let text = std::fs::read_to_string(&path).expect("read expected report");
    serde_json::from_str(&text).expect("parse expected report")
}

fn assert_fixture(fixture_name: &str, expected_exit: i32) {
    let (code, report) = run_check_on_fixture(fixture_name, &[]);
    assert_eq!(
        report,
        load_expected_report(fixture_name),
        "report mismatch for fixture '{fixture_name}'"
    );
    assert_eq!(code, expected_exit, "exit code mismatch for fixture '{fixture_name}'");
}

#[test]
fn unencrypted_bucket_fails() {
    assert_fixture("scenario_unencrypted_bucket", 1);
}

#[test]
fn flow_log_witness_passes() {
    assert_fixture("scenario_flow_log_present", 0);
}

#[test]
fn missing_flow_log_fails() {
    assert_fixture("scenario_flow_log_missing", 1);
}

#[test]
fn cpu_over_limit_fails() {
    assert_fixture("scenario_cpu_over_limit", 1);
}

#[test]
fn cpu_within_limit_passes() {
    assert_fixture("scenario_cpu_within_limit", 0);
}

#[test]
fn unparsable_cpu_is_isolated() {
    assert_fixture("scenario_unparsable_cpu", 1);
}

#[test]
fn pci_tag_without_waf_fails_globally() {
    assert_fixture("scenario_pci_without_waf", 1);
}

#[test]
fn build_dialect_with_container_pack() {
    assert_fixture("build_container_pack", 1);
}

#[test]
fn check_is_idempotent() {
    let (_, first) = run_check_on_fixture("scenario_unparsable_cpu", &[]);
    let (_, second) = run_check_on_fixture("scenario_unparsable_cpu", &["--threads", "1"]);
    assert_eq!(first, second);
}

#[test]
fn expired_deadline_is_incomplete() {
    let (code, report) =
        run_check_on_fixture("scenario_unencrypted_bucket", &["--deadline-ms", "0"]);
    assert_eq!(code, 3);
    assert_eq!(report["verdict"], "incomplete");
    assert_eq!(report["violations"], Value::Array(Vec::new()));
}

#[test]
fn cyclic_helpers_are_a_load_error() {
    let fixture = fixtures_dir().join("load_error_cyclic_helpers");
    let temp_dir = TempDir::new().expect("create temp dir");
    let report_path = temp_dir.path().join("report.json");

    check_cmd(&fixture, &report_path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cyclic helper references"));
    assert!(!report_path.exists());
}

#[test]
fn markdown_is_written_alongside_the_report() {
    let fixture = fixtures_dir().join("scenario_flow_log_missing");
    let temp_dir = TempDir::new().expect("create temp dir");
    let report_path = temp_dir.path().join("report.json");
    let md_path = temp_dir.path().join("out").join("comment.md");

    check_cmd(&fixture, &report_path)
        .arg("--write-markdown")
        .arg("--markdown-out")
        .arg(&md_path)
        .assert()
        .code(1);

    let md = std::fs::read_to_string(&md_path).expect("read markdown");
    assert!(md.contains("Verdict: **FAIL**"));
    assert!(md.contains("- [DENY] `network.flow_logs` at `vpc1`: network vpc1 has no flow log attached"));
}

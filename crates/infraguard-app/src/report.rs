use anyhow::Context;
use infraguard_render::{
    RenderableData, RenderableFinding, RenderableReport, RenderableSeverity,
    RenderableVerdictStatus,
};
use infraguard_types::{EvaluationReport, Severity, Verdict};

pub fn parse_report_json(text: &str) -> anyhow::Result<EvaluationReport> {
    serde_json::from_str(text).context("parse report json")
}

pub fn serialize_report(report: &EvaluationReport) -> anyhow::Result<Vec<u8>> {
    let mut data = serde_json::to_vec_pretty(report).context("serialize report")?;
    data.push(b'\n');
    Ok(data)
}

pub fn to_renderable(report: &EvaluationReport) -> RenderableReport {
    let violations = report.violations.iter().map(|v| RenderableFinding {
        severity: match v.severity {
            Severity::Deny => RenderableSeverity::Deny,
            Severity::Warn => RenderableSeverity::Warn,
        },
        rule_id: v.rule_id.clone(),
        address: v.resource_address.clone(),
        message: v.message.clone(),
    });
    let indeterminates = report.indeterminates.iter().map(|i| RenderableFinding {
        severity: RenderableSeverity::Indeterminate,
        rule_id: i.rule_id.clone(),
        address: i.resource_address.clone(),
        message: i.reason.clone(),
    });

    RenderableReport {
        verdict: match report.verdict {
            Verdict::Pass => RenderableVerdictStatus::Pass,
            Verdict::Fail => RenderableVerdictStatus::Fail,
            Verdict::Incomplete => RenderableVerdictStatus::Incomplete,
        },
        findings: violations.chain(indeterminates).collect(),
        data: RenderableData {
            deny: report.counts.deny,
            warn: report.counts.warn,
            indeterminate: report.counts.indeterminate,
            note: (report.verdict == Verdict::Incomplete)
                .then(|| "evaluation was interrupted; results are partial".to_string()),
        },
    }
}

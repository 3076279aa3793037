use crate::{RenderableReport, RenderableSeverity, RenderableVerdictStatus};

pub fn render_markdown(report: &RenderableReport) -> String {
    let mut out = String::new();

    out.push_str("# Infraguard report\n\n");
    let verdict = match report.verdict {
        RenderableVerdictStatus::Pass => "PASS",
        RenderableVerdictStatus::Fail => "FAIL",
        RenderableVerdictStatus::Incomplete => "INCOMPLETE",
    };
    out.push_str(&format!(
        "- Verdict: **{}**\n- Violations: {} deny / {} warn\n- Indeterminate: {}\n\n",
        verdict, report.data.deny, report.data.warn, report.data.indeterminate
    ));

    if let Some(note) = &report.data.note {
        out.push_str(&format!("> Note: {}\n\n", note));
    }

    if report.findings.is_empty() {
        out.push_str("No violations.\n");
        return out;
    }

    let (undecided, violations): (Vec<_>, Vec<_>) = report
        .findings
        .iter()
        .partition(|f| f.severity == RenderableSeverity::Indeterminate);

    if !violations.is_empty() {
        out.push_str("## Violations\n\n");
        for f in violations {
            let sev = match f.severity {
                RenderableSeverity::Deny => "DENY",
                _ => "WARN",
            };
            out.push_str(&format!(
                "- [{}] `{}` at `{}`: {}\n",
                sev, f.rule_id, f.address, f.message
            ));
        }
    }

    if !undecided.is_empty() {
        if !out.ends_with("\n\n") {
            out.push('\n');
        }
        out.push_str("## Indeterminate\n\n");
        for f in undecided {
            out.push_str(&format!(
                "- `{}` at `{}`: {}\n",
                f.rule_id, f.address, f.message
            ));
        }
    }

    out
}

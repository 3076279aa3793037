use crate::{RenderableReport, RenderableSeverity};

/// Render findings as GitHub Actions workflow command annotations.
///
/// Format:
/// `::{level} title={rule_id}::{address}: {message}`
pub fn render_github_annotations(report: &RenderableReport) -> Vec<String> {
    let mut out = Vec::new();

    for f in &report.findings {
        let level = match f.severity {
            RenderableSeverity::Deny => "error",
            RenderableSeverity::Warn => "warning",
            RenderableSeverity::Indeterminate => "notice",
        };

        let message = escape_data(&format!("{}: {}", f.address, f.message));
        out.push(format!(
            "::{} title={}::{}",
            level,
            escape_property(&f.rule_id),
            message
        ));
    }

    out
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}

//! Render use cases: markdown and GitHub annotations from in-memory reports.

use infraguard_render::RenderableReport;

pub fn render_markdown(report: &RenderableReport) -> String {
    infraguard_render::render_markdown(report)
}

pub fn render_annotations(report: &RenderableReport, max: usize) -> Vec<String> {
    infraguard_render::render_github_annotations(report)
        .into_iter()
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use infraguard_render::{
        RenderableData, RenderableFinding, RenderableReport, RenderableSeverity,
        RenderableVerdictStatus,
    };

    fn sample_report() -> RenderableReport {
        let finding = |severity, rule_id: &str| RenderableFinding {
            severity,
            rule_id: rule_id.to_string(),
            address: "aws_s3_bucket.logs".to_string(),
            message: "bad".to_string(),
        };
        RenderableReport {
            verdict: RenderableVerdictStatus::Fail,
            findings: vec![
                finding(RenderableSeverity::Deny, "storage.bucket_public"),
                finding(RenderableSeverity::Warn, "storage.bucket_versioning"),
            ],
            data: RenderableData {
                deny: 1,
                warn: 1,
                indeterminate: 0,
                note: None,
            },
        }
    }

    #[test]
    fn render_annotations_respects_max() {
        let report = sample_report();
        let annotations = render_annotations(&report, 1);
        assert_eq!(annotations.len(), 1);
        assert!(annotations[0].starts_with("::error "));
    }

    #[test]
    fn render_markdown_smoke() {
        let report = sample_report();
        let markdown = render_markdown(&report);
        assert!(markdown.contains("storage.bucket_versioning"));
    }
}

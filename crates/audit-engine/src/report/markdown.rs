//! Markdown summary of an audit report

use std::fmt;

use shared_types::{Category, Violation};

use super::AuditReport;

/// Entries listed per section before collapsing into a remainder line
const SECTION_LIMIT: usize = 5;

/// Markdown rendering of an [`AuditReport`]
pub struct MarkdownSummary<'a> {
    report: &'a AuditReport,
}

impl<'a> MarkdownSummary<'a> {
    pub fn new(report: &'a AuditReport) -> Self {
        Self { report }
    }

    fn section(
        &self,
        f: &mut fmt::Formatter<'_>,
        index: usize,
        category: Category,
    ) -> fmt::Result {
        let (title, noun) = match category {
            Category::HardcodedColor => ("Hardcoded Colors", "hardcoded colors"),
            Category::InlineStyle => ("Inline Styles", "inline styles"),
            Category::AccessibilityStructural => ("Accessibility", "accessibility issues"),
        };
        let entries: Vec<&Violation> = self.report.violations_in_category(category).collect();

        writeln!(f, "## {}. {}", index, title)?;
        writeln!(f)?;
        writeln!(f, "Found {} {}.", entries.len(), noun)?;
        if !entries.is_empty() {
            writeln!(f)?;
        }
        for violation in entries.iter().take(SECTION_LIMIT) {
            write_entry(f, violation)?;
        }
        if entries.len() > SECTION_LIMIT {
            writeln!(f, "- ... and {} more.", entries.len() - SECTION_LIMIT)?;
        }
        writeln!(f)
    }
}

fn write_entry(f: &mut fmt::Formatter<'_>, violation: &Violation) -> fmt::Result {
    let finding = &violation.finding;
    write!(f, "- `{}:{}`: ", finding.document_id, finding.line)?;
    match (violation.category(), &violation.suggested_replacement) {
        (Category::HardcodedColor, Some(replacement)) => {
            writeln!(f, "`{}` -> **{}**", finding.raw_text, replacement)
        }
        (Category::HardcodedColor, None) => {
            writeln!(f, "`{}` (no matching token)", finding.raw_text)
        }
        (Category::InlineStyle, Some(class)) => {
            writeln!(f, "`{}` -> **.{}**", finding.raw_text, class)
        }
        _ => writeln!(f, "{}", finding.message),
    }
}

impl fmt::Display for MarkdownSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;

        writeln!(f, "# Design Audit Summary")?;
        writeln!(f)?;
        writeln!(f, "Generated on: {}", report.generated_at.to_rfc3339())?;
        writeln!(f)?;
        writeln!(f, "| Metric | Value |")?;
        writeln!(f, "|--------|-------|")?;
        writeln!(f, "| Documents scanned | {} |", report.documents_scanned)?;
        writeln!(f, "| Violations | {} |", report.violations.len())?;
        writeln!(f, "| Auto-fixable | {} |", report.fixable_count())?;
        for (severity, count) in report.counts_by_severity.iter().rev() {
            writeln!(f, "| Severity {} | {} |", severity, count)?;
        }
        writeln!(f)?;

        for (i, category) in Category::ALL.into_iter().enumerate() {
            self.section(f, i + 1, category)?;
        }

        if !report.warnings.is_empty() {
            writeln!(f, "## Warnings")?;
            writeln!(f)?;
            for warning in &report.warnings {
                writeln!(f, "- `{}`: {}", warning.document_id, warning.message)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::violation;
    use crate::report::Reporter;
    use chrono::{TimeZone, Utc};
    use shared_types::{Document, DocumentKind, ScanWarning, Severity};

    fn report(violations: Vec<Violation>, warnings: Vec<ScanWarning>) -> AuditReport {
        let documents = vec![Document::new("a.css", DocumentKind::Stylesheet, "")];
        Reporter::build_at(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            &documents,
            violations,
            warnings,
        )
    }

    #[test]
    fn test_sections_and_header() {
        let output = report(vec![violation("a.css", Category::HardcodedColor, 2, "f")], vec![])
            .to_markdown();

        assert!(output.starts_with("# Design Audit Summary\n"));
        assert!(output.contains("Generated on: 2024-01-01T00:00:00+00:00"));
        assert!(output.contains("## 1. Hardcoded Colors"));
        assert!(output.contains("Found 1 hardcoded colors."));
        assert!(output.contains("- `a.css:2`: `#fff` -> **white**"));
        assert!(output.contains("## 3. Accessibility"));
        assert!(output.contains("Found 0 accessibility issues."));
        assert!(!output.contains("## Warnings"));
    }

    #[test]
    fn test_long_section_is_truncated() {
        let violations = (1..=8)
            .map(|line| violation("a.css", Category::HardcodedColor, line, &line.to_string()))
            .collect();
        let output = report(violations, vec![]).to_markdown();

        assert!(output.contains("- `a.css:5`:"));
        assert!(!output.contains("- `a.css:6`:"));
        assert!(output.contains("- ... and 3 more."));
    }

    #[test]
    fn test_unmapped_and_accessibility_entries() {
        let mut unmapped = violation("a.css", Category::HardcodedColor, 1, "u");
        unmapped.auto_fixable = false;
        unmapped.suggested_replacement = None;
        let mut heading = violation("a.css", Category::AccessibilityStructural, 4, "h");
        heading.severity = Severity::High;
        heading.finding.message = "Heading level skipped".to_string();

        let output = report(vec![unmapped, heading], vec![]).to_markdown();

        assert!(output.contains("`#fff` (no matching token)"));
        assert!(output.contains("- `a.css:4`: Heading level skipped"));
        assert!(output.contains("| Severity high | 1 |"));
    }

    #[test]
    fn test_warnings_section() {
        let warnings = vec![ScanWarning {
            document_id: "gone.html".to_string(),
            message: "Document not found: gone.html".to_string(),
        }];
        let output = report(vec![], warnings).to_markdown();

        assert!(output.contains("## Warnings"));
        assert!(output.contains("- `gone.html`: Document not found: gone.html"));
    }
}

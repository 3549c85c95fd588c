//! Subcommand implementations
//!
//! Each command loads what it needs from the configuration, delegates to the
//! engine or the fixer, and persists results. No audit logic lives here.

use std::fs;
use std::path::Path;

use anyhow::Context;
use audit_engine::config::AuditConfig;
use audit_engine::{AuditEngine, AuditReport, ReportDiff};
use fix_core::{FixMode, FixStatus, FixSummary, Fixer, FsStore, Selector, Workspace};

use crate::discover::discover;

/// Scan the configured sources and persist the report
pub fn scan(config: &AuditConfig) -> anyhow::Result<AuditReport> {
    let sources = discover(&config.sources)?;
    let workspace = Workspace::new(FsStore::new(&config.sources.root));
    let (documents, warnings) = workspace.load_all(&sources);

    let engine = AuditEngine::new(config.token_table()?);
    let report = engine.audit(&documents, warnings);
    write_report(config, &report)?;
    Ok(report)
}

/// Write the JSON report and, if configured, the Markdown summary
pub fn write_report(config: &AuditConfig, report: &AuditReport) -> anyhow::Result<()> {
    let json = report.to_json(true).context("Failed to serialize report")?;
    write_file(&config.report.json, &json)?;
    tracing::info!(path = %config.report.json.display(), "wrote report");

    if let Some(markdown) = &config.report.markdown {
        write_file(markdown, &report.to_markdown())?;
        tracing::info!(path = %markdown.display(), "wrote summary");
    }
    Ok(())
}

/// The last persisted report
pub fn load_report(config: &AuditConfig) -> anyhow::Result<AuditReport> {
    read_report(&config.report.json).context("No usable report; run `design-audit scan` first")
}

pub fn read_report(path: &Path) -> anyhow::Result<AuditReport> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read report: {}", path.display()))?;
    AuditReport::from_json(&json).with_context(|| format!("Failed to parse report: {}", path.display()))
}

/// Fix violations selected from the last report.
///
/// After anything is written the report is rebuilt, so it never describes
/// content that no longer exists.
pub fn fix(config: &AuditConfig, selector: &Selector, mode: FixMode) -> anyhow::Result<FixSummary> {
    let report = load_report(config)?;
    let workspace = Workspace::new(FsStore::new(&config.sources.root));
    let fixer = Fixer::new(&workspace).with_utility_stylesheet(config.fix.utility_stylesheet.clone());
    let summary = fixer.fix(&report, selector, mode)?;

    if mode == FixMode::Apply && summary.count(FixStatus::Applied) > 0 {
        let refreshed = scan(config)?;
        tracing::info!(violations = refreshed.violations.len(), "report refreshed after fix");
    }
    Ok(summary)
}

/// Compare `previous` with `current`, or with the last persisted report
pub fn diff(config: &AuditConfig, previous: &Path, current: Option<&Path>) -> anyhow::Result<ReportDiff> {
    let before = read_report(previous)?;
    let after = match current {
        Some(path) => read_report(path)?,
        None => load_report(config)?,
    };
    Ok(ReportDiff::between(&before, &after))
}

/// One-screen overview of a report
pub fn report_overview(report: &AuditReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Scanned {} documents: {} violations ({} auto-fixable)\n",
        report.documents_scanned,
        report.violations.len(),
        report.fixable_count()
    ));
    for (category, count) in &report.counts_by_category {
        output.push_str(&format!("  {:<26} {}\n", category, count));
    }
    for warning in &report.warnings {
        output.push_str(&format!("  warning: {}\n", warning.message));
    }
    output
}

pub fn diff_overview(diff: &ReportDiff) -> String {
    let mut output = format!(
        "{} added, {} resolved\n",
        diff.added.len(),
        diff.resolved.len()
    );
    for (sign, violations) in [("+", &diff.added), ("-", &diff.resolved)] {
        for v in violations {
            output.push_str(&format!(
                "{} {}:{} [{}] {}\n",
                sign,
                v.document_id(),
                v.finding.line,
                v.category(),
                v.finding.message
            ));
        }
    }
    output
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Category;
    use std::path::PathBuf;

    fn project() -> (tempfile::TempDir, AuditConfig) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("templates")).unwrap();
        fs::create_dir_all(root.join("static/css")).unwrap();
        fs::write(
            root.join("templates/index.html"),
            "<h1>Home</h1>\n<div style=\"margin: 0\">x</div>\n",
        )
        .unwrap();
        fs::write(
            root.join("static/css/main.css"),
            "a { color: #4F46E5; }\nb { background: #FFF; }\n",
        )
        .unwrap();

        let mut config = AuditConfig::default();
        config.sources.root = root.to_path_buf();
        config.report.json = root.join("out/audit_report.json");
        config.report.markdown = Some(root.join("out/AUDIT_SUMMARY.md"));
        (dir, config)
    }

    #[test]
    fn test_scan_writes_reports() {
        let (_dir, config) = project();
        let report = scan(&config).unwrap();

        assert_eq!(report.documents_scanned, 2);
        assert_eq!(report.count(Category::HardcodedColor), 2);
        assert_eq!(report.count(Category::InlineStyle), 1);

        let loaded = load_report(&config).unwrap();
        assert_eq!(loaded, report);
        let summary = fs::read_to_string(config.report.markdown.as_ref().unwrap()).unwrap();
        assert!(summary.contains("# Design Audit Summary"));
        assert!(report_overview(&report).starts_with("Scanned 2 documents: 3 violations (3 auto-fixable)"));
    }

    #[test]
    fn test_fix_then_diff() {
        let (_dir, config) = project();
        let before = scan(&config).unwrap();
        let previous = config.sources.root.join("before.json");
        fs::write(&previous, before.to_json(false).unwrap()).unwrap();

        let summary = fix(&config, &Selector::all_hardcoded_colors(), FixMode::Apply).unwrap();
        assert_eq!(summary.count(FixStatus::Applied), 1);

        let after = scan(&config).unwrap();
        assert_eq!(after.count(Category::HardcodedColor), 0);

        let changes = diff(&config, &previous, None).unwrap();
        assert_eq!(changes.resolved.len(), 2);
        assert!(changes.added.is_empty());
        assert!(diff_overview(&changes).starts_with("0 added, 2 resolved"));
    }

    #[test]
    fn test_repeated_fingerprint_fix_is_noop() {
        let (_dir, config) = project();
        let report = scan(&config).unwrap();
        let target = report
            .violations_in_category(Category::HardcodedColor)
            .next()
            .unwrap();
        let selector = Selector::fingerprint(target.fingerprint.clone());

        let first = fix(&config, &selector, FixMode::Apply).unwrap();
        assert_eq!(first.count(FixStatus::Applied), 1);
        let fixed = fs::read_to_string(config.sources.root.join("static/css/main.css")).unwrap();

        let second = fix(&config, &selector, FixMode::Apply).unwrap();
        assert!(second.is_noop());
        assert!(!second.has_failures());
        assert_eq!(
            fs::read_to_string(config.sources.root.join("static/css/main.css")).unwrap(),
            fixed
        );
    }

    #[test]
    fn test_missing_report_is_an_error() {
        let mut config = AuditConfig::default();
        config.report.json = PathBuf::from("/nonexistent/audit_report.json");
        assert!(load_report(&config).is_err());
    }
}

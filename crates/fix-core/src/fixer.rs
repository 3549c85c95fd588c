//! Fix orchestration
//!
//! A fix request is resolved against a report, split per document, and each
//! document is planned and written inside its own exclusive section. The
//! staleness check, planning and write for one document all happen under
//! that document's lock. Documents are processed in parallel; a failure on
//! one never rolls back another.
//!
//! Inline style extraction touches two documents: the markup (style
//! attribute becomes a class) and the utility stylesheet (class rule is
//! appended). The stylesheet is updated after the markup documents, under
//! its own lock, with only the rules the successful documents need.

use std::collections::{BTreeMap, BTreeSet};

use audit_engine::AuditReport;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use shared_types::{hash_document, Category, Document, DocumentKind, ReadError, Violation};

use crate::apply::{apply, Applied};
use crate::error::FixError;
use crate::plan::{plan_document, plan_utility_rules, DocumentPlan, RewritePlan, UtilityRule};
use crate::selector::Selector;
use crate::store::{DocumentStore, Workspace};

/// Stylesheet receiving extracted utility classes unless configured otherwise
pub const DEFAULT_UTILITY_STYLESHEET: &str = "static/css/utilities.css";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixMode {
    /// Plan only; nothing is written
    DryRun,
    Apply,
}

/// Outcome for one targeted document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Applied,
    /// Dry run: the plan was computed and would apply cleanly
    Planned,
    /// The document already holds the fixed content
    NoOp,
    /// The document changed since the report, or a class rule collides
    Conflict,
    NotFixable,
    /// Unexpected read, span or write failure
    Failed,
}

impl FixStatus {
    pub fn from_error(err: &FixError) -> Self {
        match err {
            FixError::Conflict(_) | FixError::ClassCollision { .. } | FixError::UnknownDocument(_) => {
                FixStatus::Conflict
            }
            FixError::NotFixable { .. } => FixStatus::NotFixable,
            FixError::Read(ReadError::NotFound(_)) => FixStatus::Conflict,
            FixError::NotFound(_)
            | FixError::OverlappingEdits(_)
            | FixError::InvalidSpan { .. }
            | FixError::Read(_)
            | FixError::Io { .. } => FixStatus::Failed,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FixStatus::Conflict | FixStatus::NotFixable | FixStatus::Failed)
    }

    fn label(&self) -> &'static str {
        match self {
            FixStatus::Applied => "applied",
            FixStatus::Planned => "planned",
            FixStatus::NoOp => "no-op",
            FixStatus::Conflict => "conflict",
            FixStatus::NotFixable => "not-fixable",
            FixStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub document: String,
    pub status: FixStatus,
    /// Fingerprints of the violations resolved (or, in a dry run, that would be)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolved: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DocumentOutcome {
    fn success(document: &str, status: FixStatus, plan: &RewritePlan) -> Self {
        Self {
            document: document.to_string(),
            status,
            resolved: plan.fingerprints.clone(),
            detail: None,
        }
    }

    fn failure(document: &str, err: &FixError) -> Self {
        Self {
            document: document.to_string(),
            status: FixStatus::from_error(err),
            resolved: Vec::new(),
            detail: Some(err.to_string()),
        }
    }
}

/// Per-document result of one fix request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSummary {
    pub selector: Selector,
    pub mode: FixMode,
    pub outcomes: Vec<DocumentOutcome>,
    /// Plans that were applied, or would be in a dry run
    pub plans: Vec<RewritePlan>,
}

impl FixSummary {
    fn empty(selector: &Selector, mode: FixMode) -> Self {
        Self {
            selector: selector.clone(),
            mode,
            outcomes: Vec::new(),
            plans: Vec::new(),
        }
    }

    pub fn status(&self, document: &str) -> Option<FixStatus> {
        self.outcomes
            .iter()
            .find(|o| o.document == document)
            .map(|o| o.status)
    }

    pub fn count(&self, status: FixStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Nothing was (or would be) changed
    pub fn is_noop(&self) -> bool {
        self.outcomes.iter().all(|o| o.status == FixStatus::NoOp)
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.status.is_failure())
    }

    pub fn to_text(&self) -> String {
        let mut output = String::new();
        let mode = match self.mode {
            FixMode::DryRun => "dry run",
            FixMode::Apply => "apply",
        };
        output.push_str(&format!("Fix ({mode}): {}\n", self.selector));

        if self.outcomes.is_empty() {
            output.push_str("  nothing to fix\n");
        }
        for outcome in &self.outcomes {
            output.push_str(&format!("  {:<12} {}", outcome.status.label(), outcome.document));
            if !outcome.resolved.is_empty() {
                output.push_str(&format!(" ({} violations)", outcome.resolved.len()));
            }
            if let Some(detail) = &outcome.detail {
                output.push_str(&format!(": {detail}"));
            }
            output.push('\n');
        }
        output
    }
}

pub struct Fixer<'w, S> {
    workspace: &'w Workspace<S>,
    utility_stylesheet: String,
}

impl<'w, S: DocumentStore> Fixer<'w, S> {
    pub fn new(workspace: &'w Workspace<S>) -> Self {
        Self {
            workspace,
            utility_stylesheet: DEFAULT_UTILITY_STYLESHEET.to_string(),
        }
    }

    pub fn with_utility_stylesheet(mut self, id: impl Into<String>) -> Self {
        self.utility_stylesheet = id.into();
        self
    }

    /// Compute the plans for `selector` without writing anything.
    ///
    /// Unlike [`Fixer::fix`] the first problem is returned as an error.
    pub fn plan(&self, report: &AuditReport, selector: &Selector) -> Result<Vec<RewritePlan>, FixError> {
        let groups = group_by_document(selector.select(report)?);
        let mut plans = Vec::new();
        let mut rules = Vec::new();

        for (document_id, violations) in &groups {
            let (_, planned) = self
                .workspace
                .locks()
                .with_lock(document_id, || self.plan_current(report, document_id, violations))?;
            rules.extend(planned.utility_rules);
            plans.push(planned.plan);
        }

        if !rules.is_empty() {
            let plan = self.workspace.locks().with_lock(&self.utility_stylesheet, || {
                plan_utility_rules(&self.load_utility_stylesheet()?, &rules)
            })?;
            if !plan.is_empty() {
                plans.push(plan);
            }
        }
        Ok(plans)
    }

    /// Resolve `selector` against `report` and fix every targeted document.
    ///
    /// Outcomes are reported per document in the summary. A fingerprint the
    /// report does not contain yields an empty summary: against a current
    /// report that means the violation is already fixed.
    pub fn fix(&self, report: &AuditReport, selector: &Selector, mode: FixMode) -> Result<FixSummary, FixError> {
        let mut summary = FixSummary::empty(selector, mode);
        let selected = match selector.select(report) {
            Ok(selected) => selected,
            Err(err @ FixError::NotFixable { .. }) => {
                let document = err.document().unwrap_or_default().to_string();
                tracing::info!(%document, %selector, "selected violation is not auto-fixable");
                summary.outcomes.push(DocumentOutcome::failure(&document, &err));
                return Ok(summary);
            }
            // Absent from a current report: already fixed, nothing to do
            Err(FixError::NotFound(_)) => {
                tracing::warn!(%selector, "fingerprint not in report, nothing to fix");
                return Ok(summary);
            }
            Err(err) => return Err(err),
        };
        if selected.is_empty() {
            tracing::info!(%selector, "nothing to fix");
            return Ok(summary);
        }

        let mut groups = group_by_document(selected);
        let collisions = match self.colliding_classes(&groups) {
            Ok(collisions) => collisions,
            Err(err) => {
                // A class without its rule would unstyle the markup
                tracing::warn!(
                    document = %self.utility_stylesheet,
                    error = %err,
                    "utility stylesheet unreadable, skipping inline style fixes"
                );
                groups.retain(|(document_id, violations)| {
                    let extracts = violations.iter().any(|v| v.category() == Category::InlineStyle);
                    if extracts {
                        summary.outcomes.push(DocumentOutcome::failure(document_id, &err));
                    }
                    !extracts
                });
                BTreeSet::new()
            }
        };

        let results: Vec<(DocumentOutcome, Option<DocumentPlan>)> = groups
            .par_iter()
            .map(|(document_id, violations)| {
                self.workspace.locks().with_lock(document_id, || {
                    self.fix_document(report, document_id, violations, mode, &collisions)
                })
            })
            .collect();

        let mut rules = Vec::new();
        for (outcome, planned) in results {
            if let Some(planned) = planned {
                rules.extend(planned.utility_rules);
                summary.plans.push(planned.plan);
            }
            summary.outcomes.push(outcome);
        }
        summary.outcomes.sort_by(|a, b| a.document.cmp(&b.document));

        if !rules.is_empty() {
            let (outcome, plan) = self
                .workspace
                .locks()
                .with_lock(&self.utility_stylesheet, || self.fix_utility_stylesheet(&rules, mode));
            summary.plans.extend(plan);
            summary.outcomes.push(outcome);
        }

        tracing::info!(
            %selector,
            applied = summary.count(FixStatus::Applied),
            planned = summary.count(FixStatus::Planned),
            conflicts = summary.count(FixStatus::Conflict),
            failed = summary.count(FixStatus::Failed),
            "fix complete"
        );
        Ok(summary)
    }

    /// Re-apply previously computed plans. A document already holding a
    /// plan's result is a no-op.
    pub fn apply_plans(&self, plans: &[RewritePlan]) -> Vec<DocumentOutcome> {
        plans
            .par_iter()
            .map(|plan| {
                let id = plan.target_document.as_str();
                self.workspace.locks().with_lock(id, || {
                    let result = self
                        .load_for_plan(plan)
                        .and_then(|current| self.write_plan(plan, &current));
                    match result {
                        Ok(status) => DocumentOutcome::success(id, status, plan),
                        Err(err) => DocumentOutcome::failure(id, &err),
                    }
                })
            })
            .collect()
    }

    /// Load the document, check it against the report and plan it.
    /// Must run under the document's lock.
    fn plan_current(
        &self,
        report: &AuditReport,
        document_id: &str,
        violations: &[&Violation],
    ) -> Result<(Document, DocumentPlan), FixError> {
        let scanned = report
            .document(document_id)
            .ok_or_else(|| FixError::UnknownDocument(document_id.to_string()))?;
        let current = self.workspace.load(document_id, scanned.kind).map_err(|err| match err {
            ReadError::NotFound(id) => FixError::Conflict(id),
            err => FixError::Read(err),
        })?;
        if current.fingerprint != scanned.fingerprint {
            return Err(FixError::Conflict(document_id.to_string()));
        }

        let planned = plan_document(&current, violations)?;
        Ok((current, planned))
    }

    fn fix_document(
        &self,
        report: &AuditReport,
        document_id: &str,
        violations: &[&Violation],
        mode: FixMode,
        collisions: &BTreeSet<String>,
    ) -> (DocumentOutcome, Option<DocumentPlan>) {
        let result = self
            .plan_current(report, document_id, violations)
            .and_then(|(current, planned)| {
                if let Some(rule) = planned.utility_rules.iter().find(|r| collisions.contains(&r.class)) {
                    return Err(FixError::ClassCollision {
                        class: rule.class.clone(),
                        document: self.utility_stylesheet.clone(),
                    });
                }
                let status = match mode {
                    FixMode::DryRun => FixStatus::Planned,
                    FixMode::Apply => self.write_plan(&planned.plan, &current)?,
                };
                Ok((status, planned))
            });

        match result {
            Ok((status, planned)) => {
                tracing::info!(document = %document_id, status = status.label(), edits = planned.plan.edits.len(), "fixed document");
                (DocumentOutcome::success(document_id, status, &planned.plan), Some(planned))
            }
            Err(err) => {
                tracing::warn!(document = %document_id, error = %err, "fix rejected");
                (DocumentOutcome::failure(document_id, &err), None)
            }
        }
    }

    /// Append the rules the fixed documents depend on. Must run under the
    /// stylesheet's lock.
    fn fix_utility_stylesheet(&self, rules: &[UtilityRule], mode: FixMode) -> (DocumentOutcome, Option<RewritePlan>) {
        let id = self.utility_stylesheet.as_str();
        let result = self.load_utility_stylesheet().and_then(|current| {
            let plan = plan_utility_rules(&current, rules)?;
            let status = if plan.is_empty() {
                FixStatus::NoOp
            } else {
                match mode {
                    FixMode::DryRun => FixStatus::Planned,
                    FixMode::Apply => self.write_plan(&plan, &current)?,
                }
            };
            Ok((status, plan))
        });

        match result {
            Ok((status, plan)) => {
                tracing::info!(document = %id, status = status.label(), "updated utility stylesheet");
                let outcome = DocumentOutcome::success(id, status, &plan);
                (outcome, (!plan.is_empty()).then_some(plan))
            }
            Err(err) => {
                tracing::warn!(document = %id, error = %err, "utility stylesheet not updated");
                (DocumentOutcome::failure(id, &err), None)
            }
        }
    }

    /// Classes whose rule already exists in the utility stylesheet with
    /// different declarations. Fails if the stylesheet cannot be read.
    fn colliding_classes(&self, groups: &[(String, Vec<&Violation>)]) -> Result<BTreeSet<String>, FixError> {
        let rules: Vec<UtilityRule> = groups
            .iter()
            .flat_map(|(_, violations)| violations.iter())
            .filter(|v| v.category() == Category::InlineStyle)
            .filter_map(|v| UtilityRule::for_violation(v))
            .collect();
        if rules.is_empty() {
            return Ok(BTreeSet::new());
        }

        self.workspace.locks().with_lock(&self.utility_stylesheet, || {
            let sheet = self.load_utility_stylesheet()?;
            Ok(rules
                .iter()
                .filter(|rule| {
                    matches!(
                        plan_utility_rules(&sheet, std::slice::from_ref(*rule)),
                        Err(FixError::ClassCollision { .. })
                    )
                })
                .map(|rule| rule.class.clone())
                .collect())
        })
    }

    /// The utility stylesheet; a missing one is treated as empty
    fn load_utility_stylesheet(&self) -> Result<Document, FixError> {
        match self.workspace.load(&self.utility_stylesheet, DocumentKind::Stylesheet) {
            Ok(document) => Ok(document),
            Err(ReadError::NotFound(_)) => Ok(Document::new(
                self.utility_stylesheet.clone(),
                DocumentKind::Stylesheet,
                "",
            )),
            Err(err) => Err(err.into()),
        }
    }

    fn load_for_plan(&self, plan: &RewritePlan) -> Result<Document, FixError> {
        match self.workspace.load(&plan.target_document, plan.kind) {
            Ok(document) => Ok(document),
            Err(ReadError::NotFound(_)) if plan.base_fingerprint == hash_document(b"") => Ok(
                Document::new(plan.target_document.clone(), plan.kind, ""),
            ),
            Err(err) => Err(err.into()),
        }
    }

    /// Apply `plan` to `current` and persist the result
    fn write_plan(&self, plan: &RewritePlan, current: &Document) -> Result<FixStatus, FixError> {
        match apply(plan, current)? {
            Applied::Unchanged => Ok(FixStatus::NoOp),
            Applied::Updated(updated) => {
                self.workspace
                    .store()
                    .write(&updated)
                    .map_err(|source| FixError::Io {
                        document: updated.id.clone(),
                        source,
                    })?;
                Ok(FixStatus::Applied)
            }
        }
    }
}

/// Selected violations grouped per document, in document id order
fn group_by_document(violations: Vec<&Violation>) -> Vec<(String, Vec<&Violation>)> {
    let mut groups: BTreeMap<String, Vec<&Violation>> = BTreeMap::new();
    for violation in violations {
        groups
            .entry(violation.document_id().to_string())
            .or_default()
            .push(violation);
    }
    groups.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use audit_engine::{AuditEngine, TokenTable};
    use pretty_assertions::assert_eq;

    const CSS: &str = "a {\n  color: #FFFFFF;\n  background: #123456;\n}\n";

    fn engine() -> AuditEngine {
        AuditEngine::new(TokenTable::from_pairs([("#ffffff", "--color-surface")]).unwrap())
    }

    fn audit(workspace: &Workspace<MemoryStore>, sources: &[(&str, DocumentKind)]) -> AuditReport {
        let sources: Vec<(String, DocumentKind)> =
            sources.iter().map(|(id, kind)| (id.to_string(), *kind)).collect();
        let (documents, warnings) = workspace.load_all(&sources);
        engine().audit(&documents, warnings)
    }

    #[test]
    fn test_fix_single_fingerprint() {
        let workspace = Workspace::new(MemoryStore::new().with("main.css", CSS));
        let report = audit(&workspace, &[("main.css", DocumentKind::Stylesheet)]);
        let target = report.violations.iter().find(|v| v.auto_fixable).unwrap();

        let summary = Fixer::new(&workspace)
            .fix(&report, &Selector::fingerprint(target.fingerprint.clone()), FixMode::Apply)
            .unwrap();

        assert_eq!(summary.status("main.css"), Some(FixStatus::Applied));
        assert_eq!(
            workspace.store().content("main.css").unwrap(),
            "a {\n  color: var(--color-surface);\n  background: #123456;\n}\n"
        );
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let workspace = Workspace::new(MemoryStore::new().with("main.css", CSS));
        let report = audit(&workspace, &[("main.css", DocumentKind::Stylesheet)]);

        let summary = Fixer::new(&workspace)
            .fix(&report, &Selector::all_hardcoded_colors(), FixMode::DryRun)
            .unwrap();

        assert_eq!(summary.status("main.css"), Some(FixStatus::Planned));
        assert_eq!(summary.plans.len(), 1);
        assert_eq!(workspace.store().content("main.css").unwrap(), CSS);
    }

    #[test]
    fn test_not_fixable_touches_nothing() {
        let workspace = Workspace::new(MemoryStore::new().with("main.css", CSS));
        let report = audit(&workspace, &[("main.css", DocumentKind::Stylesheet)]);
        let unmapped = report.violations.iter().find(|v| !v.auto_fixable).unwrap();
        let selector = Selector::fingerprint(unmapped.fingerprint.clone());
        let fixer = Fixer::new(&workspace);

        let summary = fixer.fix(&report, &selector, FixMode::Apply).unwrap();
        assert_eq!(summary.status("main.css"), Some(FixStatus::NotFixable));
        assert!(matches!(fixer.plan(&report, &selector), Err(FixError::NotFixable { .. })));
        assert_eq!(workspace.store().content("main.css").unwrap(), CSS);
    }

    #[test]
    fn test_unknown_fingerprint_is_nothing_to_fix() {
        let workspace = Workspace::new(MemoryStore::new().with("main.css", CSS));
        let report = audit(&workspace, &[("main.css", DocumentKind::Stylesheet)]);
        let fixer = Fixer::new(&workspace);
        let selector = Selector::fingerprint("0000");

        let summary = fixer.fix(&report, &selector, FixMode::Apply).unwrap();
        assert!(summary.outcomes.is_empty());
        assert!(!summary.has_failures());
        assert!(matches!(fixer.plan(&report, &selector), Err(FixError::NotFound(_))));
        assert_eq!(workspace.store().content("main.css").unwrap(), CSS);
    }

    #[test]
    fn test_refixing_against_fresh_report_is_noop() {
        let workspace = Workspace::new(MemoryStore::new().with("main.css", CSS));
        let report = audit(&workspace, &[("main.css", DocumentKind::Stylesheet)]);
        let target = report.violations.iter().find(|v| v.auto_fixable).unwrap();
        let selector = Selector::fingerprint(target.fingerprint.clone());
        let fixer = Fixer::new(&workspace);

        fixer.fix(&report, &selector, FixMode::Apply).unwrap();
        let fixed = workspace.store().content("main.css").unwrap();

        let fresh = audit(&workspace, &[("main.css", DocumentKind::Stylesheet)]);
        let again = fixer.fix(&fresh, &selector, FixMode::Apply).unwrap();
        assert!(again.is_noop());
        assert!(!again.has_failures());
        assert_eq!(workspace.store().content("main.css").unwrap(), fixed);
    }

    #[test]
    fn test_empty_bulk_selection_is_noop() {
        let workspace = Workspace::new(MemoryStore::new().with("main.css", CSS));
        let report = audit(&workspace, &[("main.css", DocumentKind::Stylesheet)]);

        let summary = Fixer::new(&workspace)
            .fix(&report, &Selector::all(Category::InlineStyle), FixMode::Apply)
            .unwrap();
        assert!(summary.outcomes.is_empty());
        assert!(summary.is_noop());
        assert!(summary.to_text().contains("nothing to fix"));
    }

    #[test]
    fn test_summary_text() {
        let workspace = Workspace::new(MemoryStore::new().with("main.css", CSS));
        let report = audit(&workspace, &[("main.css", DocumentKind::Stylesheet)]);

        let summary = Fixer::new(&workspace)
            .fix(&report, &Selector::all_hardcoded_colors(), FixMode::Apply)
            .unwrap();
        let text = summary.to_text();

        assert!(text.starts_with("Fix (apply): all auto-fixable hardcoded_color\n"));
        assert!(text.contains("applied"));
        assert!(text.contains("main.css (1 violations)"));
    }
}

//! Audit report construction and serialization
//!
//! The [`AuditReport`] defined here is the only serialized report shape. The
//! CLI persists it as JSON and reads it back when planning fixes, so every
//! field needed to check staleness travels with it.
//!
//! # Output Formats
//!
//! - **JSON**: the persisted report, compact or pretty-printed
//! - **Markdown**: a short human-readable summary, see [`MarkdownSummary`]

mod diff;
mod markdown;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{Category, Document, DocumentKind, ScanWarning, Severity, Violation};

use crate::classify::sort_violations;

pub use diff::ReportDiff;
pub use markdown::MarkdownSummary;

/// Snapshot of a scanned document, used for staleness checks at fix time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub kind: DocumentKind,
    /// SHA-256 of the content that was scanned
    pub fingerprint: String,
}

/// Result of one scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub documents_scanned: usize,
    pub documents: BTreeMap<String, DocumentSummary>,
    pub violations: Vec<Violation>,
    pub counts_by_category: BTreeMap<Category, usize>,
    pub counts_by_severity: BTreeMap<Severity, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

impl AuditReport {
    /// All violations carrying `fingerprint`.
    ///
    /// More than one entry is possible when a literal appears twice on the
    /// same line.
    pub fn violations_with_fingerprint(&self, fingerprint: &str) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.fingerprint == fingerprint)
            .collect()
    }

    pub fn violations_in_category(&self, category: Category) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(move |v| v.category() == category)
    }

    pub fn document(&self, id: &str) -> Option<&DocumentSummary> {
        self.documents.get(id)
    }

    pub fn count(&self, category: Category) -> usize {
        self.counts_by_category.get(&category).copied().unwrap_or(0)
    }

    pub fn fixable_count(&self) -> usize {
        self.violations.iter().filter(|v| v.auto_fixable).count()
    }

    /// Equality that ignores `generated_at`
    pub fn semantically_eq(&self, other: &Self) -> bool {
        self.documents_scanned == other.documents_scanned
            && self.documents == other.documents
            && self.violations == other.violations
            && self.counts_by_category == other.counts_by_category
            && self.counts_by_severity == other.counts_by_severity
            && self.warnings == other.warnings
    }

    /// Serialize as JSON
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Render the Markdown summary
    pub fn to_markdown(&self) -> String {
        MarkdownSummary::new(self).to_string()
    }
}

/// Builds [`AuditReport`]s from classified violations
pub struct Reporter;

impl Reporter {
    /// Build a report stamped with the current time
    pub fn build(
        documents: &[Document],
        violations: Vec<Violation>,
        warnings: Vec<ScanWarning>,
    ) -> AuditReport {
        Self::build_at(Utc::now(), documents, violations, warnings)
    }

    /// Build a report with an explicit timestamp
    pub fn build_at(
        generated_at: DateTime<Utc>,
        documents: &[Document],
        mut violations: Vec<Violation>,
        mut warnings: Vec<ScanWarning>,
    ) -> AuditReport {
        sort_violations(&mut violations);
        warnings.sort_by(|a, b| {
            a.document_id
                .cmp(&b.document_id)
                .then_with(|| a.message.cmp(&b.message))
        });

        let mut counts_by_category: BTreeMap<Category, usize> =
            Category::ALL.into_iter().map(|c| (c, 0)).collect();
        let mut counts_by_severity: BTreeMap<Severity, usize> =
            Severity::ALL.into_iter().map(|s| (s, 0)).collect();
        for violation in &violations {
            *counts_by_category.entry(violation.category()).or_default() += 1;
            *counts_by_severity.entry(violation.severity).or_default() += 1;
        }

        let documents: BTreeMap<String, DocumentSummary> = documents
            .iter()
            .map(|d| {
                (
                    d.id.clone(),
                    DocumentSummary {
                        kind: d.kind,
                        fingerprint: d.fingerprint.clone(),
                    },
                )
            })
            .collect();

        AuditReport {
            generated_at,
            documents_scanned: documents.len(),
            documents,
            violations,
            counts_by_category,
            counts_by_severity,
            warnings,
        }
    }
}

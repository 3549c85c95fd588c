//! Design-consistency audit engine
//!
//! Scans markup and stylesheet documents for hardcoded colors, inline styles
//! and structural accessibility problems, classifies the findings against a
//! design token table, and builds the [`report::AuditReport`] consumed by the
//! fixer.

pub mod classify;
pub mod config;
pub mod lines;
pub mod patterns;
pub mod report;
pub mod rules;
pub mod scanner;
pub mod tokens;
pub mod utility;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared_types::{Document, Finding, ScanWarning, Violation};

pub use classify::{classify, Classifier};
pub use report::{AuditReport, DocumentSummary, MarkdownSummary, ReportDiff, Reporter};
pub use scanner::scan;
pub use tokens::{normalize_color, token_reference, TokenTable, TokenTableError};

/// AuditEngine entry point
#[derive(Clone)]
pub struct AuditEngine {
    tokens: Arc<TokenTable>,
}

impl AuditEngine {
    pub fn new(tokens: TokenTable) -> Self {
        Self {
            tokens: Arc::new(tokens),
        }
    }

    pub fn with_shared_tokens(tokens: Arc<TokenTable>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    pub fn scan(&self, documents: &[Document]) -> Vec<Finding> {
        scanner::scan(documents)
    }

    pub fn classify(&self, findings: &[Finding]) -> Vec<Violation> {
        Classifier::new(&self.tokens).classify(findings)
    }

    /// Scan, classify and report. `warnings` carries documents that failed to
    /// load before the scan.
    pub fn audit(&self, documents: &[Document], warnings: Vec<ScanWarning>) -> AuditReport {
        self.audit_at(Utc::now(), documents, warnings)
    }

    pub fn audit_at(
        &self,
        generated_at: DateTime<Utc>,
        documents: &[Document],
        warnings: Vec<ScanWarning>,
    ) -> AuditReport {
        let findings = self.scan(documents);
        let violations = self.classify(&findings);
        tracing::info!(
            documents = documents.len(),
            findings = findings.len(),
            violations = violations.len(),
            warnings = warnings.len(),
            "audit complete"
        );
        Reporter::build_at(generated_at, documents, violations, warnings)
    }

    /// Violations for a single document (for testing)
    pub fn check_document(&self, document: &Document) -> Vec<Violation> {
        self.classify(&rules::check_document(document))
    }
}

impl Default for AuditEngine {
    fn default() -> Self {
        Self::new(TokenTable::builtin())
    }
}

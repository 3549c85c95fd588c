//! Finding -> Violation classification

use std::collections::HashSet;

use rayon::prelude::*;
use shared_types::{violation_fingerprint, Category, Finding, Severity, Violation};

use crate::tokens::{normalize_color, token_reference, TokenTable};
use crate::utility::{style_attribute_value, utility_class_name};

/// Classifies findings against a token table
pub struct Classifier<'a> {
    tokens: &'a TokenTable,
}

impl<'a> Classifier<'a> {
    pub fn new(tokens: &'a TokenTable) -> Self {
        Self { tokens }
    }

    /// Dedup exact duplicates, classify, and return violations in canonical
    /// order.
    pub fn classify(&self, findings: &[Finding]) -> Vec<Violation> {
        let mut seen = HashSet::new();
        let unique: Vec<&Finding> = findings
            .iter()
            .filter(|f| {
                seen.insert((
                    f.document_id.as_str(),
                    f.category,
                    f.raw_text.as_str(),
                    f.line,
                    f.column_start,
                ))
            })
            .collect();

        let mut violations: Vec<Violation> =
            unique.par_iter().map(|f| self.classify_one(f)).collect();
        sort_violations(&mut violations);
        violations
    }

    pub fn classify_one(&self, finding: &Finding) -> Violation {
        match finding.category {
            Category::HardcodedColor => self.classify_color(finding),
            Category::InlineStyle => {
                let class = utility_class_name(style_attribute_value(&finding.raw_text));
                Violation {
                    finding: finding.clone(),
                    severity: Severity::Medium,
                    auto_fixable: true,
                    suggested_replacement: Some(class),
                    fingerprint: fingerprint_of(finding, &finding.raw_text),
                }
            }
            Category::AccessibilityStructural => Violation {
                finding: finding.clone(),
                severity: Severity::High,
                auto_fixable: false,
                suggested_replacement: None,
                fingerprint: fingerprint_of(finding, &finding.raw_text),
            },
        }
    }

    fn classify_color(&self, finding: &Finding) -> Violation {
        let normalized =
            normalize_color(&finding.raw_text).unwrap_or_else(|| finding.raw_text.to_lowercase());
        let fingerprint = fingerprint_of(finding, &normalized);

        match self.tokens.lookup(&normalized) {
            Some(token) => Violation {
                finding: finding.clone(),
                severity: Severity::Medium,
                auto_fixable: true,
                suggested_replacement: Some(token_reference(token)),
                fingerprint,
            },
            // Unmapped: reported, never guessed
            None => Violation {
                finding: finding.clone(),
                severity: Severity::Low,
                auto_fixable: false,
                suggested_replacement: None,
                fingerprint,
            },
        }
    }
}

/// Convenience wrapper around [`Classifier::classify`]
pub fn classify(findings: &[Finding], tokens: &TokenTable) -> Vec<Violation> {
    Classifier::new(tokens).classify(findings)
}

fn fingerprint_of(finding: &Finding, raw: &str) -> String {
    violation_fingerprint(&finding.document_id, finding.category, raw, finding.line)
}

/// Canonical violation order: document id, line, column, then tie-breakers
pub fn sort_violations(violations: &mut [Violation]) {
    violations.sort_by(|a, b| {
        let (fa, fb) = (&a.finding, &b.finding);
        fa.document_id
            .cmp(&fb.document_id)
            .then(fa.line.cmp(&fb.line))
            .then(fa.column_start.cmp(&fb.column_start))
            .then(fa.category.cmp(&fb.category))
            .then(fa.rule.cmp(&fb.rule))
            .then(a.fingerprint.cmp(&b.fingerprint))
    });
}

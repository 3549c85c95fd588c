//! Comparison of two audit reports

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shared_types::Violation;

use super::AuditReport;

/// Violations that appeared or disappeared between two reports, keyed by
/// fingerprint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDiff {
    pub added: Vec<Violation>,
    pub resolved: Vec<Violation>,
}

impl ReportDiff {
    pub fn between(before: &AuditReport, after: &AuditReport) -> Self {
        let before_fps: BTreeSet<&str> =
            before.violations.iter().map(|v| v.fingerprint.as_str()).collect();
        let after_fps: BTreeSet<&str> =
            after.violations.iter().map(|v| v.fingerprint.as_str()).collect();

        Self {
            added: after
                .violations
                .iter()
                .filter(|v| !before_fps.contains(v.fingerprint.as_str()))
                .cloned()
                .collect(),
            resolved: before
                .violations
                .iter()
                .filter(|v| !after_fps.contains(v.fingerprint.as_str()))
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.resolved.is_empty()
    }
}

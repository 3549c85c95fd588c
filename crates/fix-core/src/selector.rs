//! Which violations a fix request targets

use std::fmt;

use audit_engine::AuditReport;
use serde::{Deserialize, Serialize};
use shared_types::{Category, Violation};

use crate::error::FixError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selector {
    /// Every violation carrying this fingerprint
    Fingerprint { fingerprint: String },
    /// Every auto-fixable violation of a category
    AllAutoFixable { category: Category },
}

impl Selector {
    pub fn fingerprint(fingerprint: impl Into<String>) -> Self {
        Selector::Fingerprint {
            fingerprint: fingerprint.into(),
        }
    }

    pub fn all(category: Category) -> Self {
        Selector::AllAutoFixable { category }
    }

    /// Bulk color fix
    pub fn all_hardcoded_colors() -> Self {
        Self::all(Category::HardcodedColor)
    }

    /// Resolve against a report.
    ///
    /// A fingerprint that matches nothing is `NotFound`; one that matches a
    /// violation without an automatic fix is `NotFixable`. Bulk selection
    /// only ever picks fixable violations and may be empty.
    pub fn select<'r>(&self, report: &'r AuditReport) -> Result<Vec<&'r Violation>, FixError> {
        match self {
            Selector::Fingerprint { fingerprint } => {
                let matches = report.violations_with_fingerprint(fingerprint);
                if matches.is_empty() {
                    return Err(FixError::NotFound(fingerprint.clone()));
                }
                if let Some(v) = matches.iter().find(|v| !v.auto_fixable) {
                    return Err(FixError::NotFixable {
                        document: v.document_id().to_string(),
                        fingerprint: fingerprint.clone(),
                    });
                }
                Ok(matches)
            }
            Selector::AllAutoFixable { category } => Ok(report
                .violations_in_category(*category)
                .filter(|v| v.auto_fixable)
                .collect()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Fingerprint { fingerprint } => write!(f, "fingerprint {fingerprint}"),
            Selector::AllAutoFixable { category } => write!(f, "all auto-fixable {category}"),
        }
    }
}

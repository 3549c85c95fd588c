use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fingerprint::hash_document;

/// Surface syntax of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Markup,
    Stylesheet,
}

impl DocumentKind {
    /// Infer the kind from a file extension. Returns `None` for files the
    /// engine does not audit.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" | "jinja" | "jinja2" | "j2" | "xhtml" => Some(DocumentKind::Markup),
            "css" => Some(DocumentKind::Stylesheet),
            _ => None,
        }
    }
}

/// A loaded document and the fingerprint of its content at load time.
///
/// Documents are values: rewriting one produces a new `Document` through
/// [`Document::with_content`], the original is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub kind: DocumentKind,
    pub content: String,
    pub fingerprint: String,
}

impl Document {
    pub fn new(id: impl Into<String>, kind: DocumentKind, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            kind,
            fingerprint: hash_document(content.as_bytes()),
            content,
        }
    }

    /// Same document identity, new content (and therefore a new fingerprint)
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self::new(self.id.clone(), self.kind, content)
    }
}

/// Violation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    HardcodedColor,
    InlineStyle,
    AccessibilityStructural,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::HardcodedColor,
        Category::InlineStyle,
        Category::AccessibilityStructural,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::HardcodedColor => "hardcoded_color",
            Category::InlineStyle => "inline_style",
            Category::AccessibilityStructural => "accessibility_structural",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s || c.as_str().replace('_', "-") == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

/// A raw pattern match produced by the scanner.
///
/// `line` is 1-based. `column_start..column_end` is a half-open range of
/// character (not byte) offsets within that line and covers `raw_text`
/// exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub document_id: String,
    pub kind: DocumentKind,
    pub line: usize,
    pub column_start: usize,
    pub column_end: usize,
    pub raw_text: String,
    pub category: Category,
    /// Identifier of the rule that matched, e.g. `heading-order`
    pub rule: String,
    pub message: String,
}

/// A classified finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(flatten)]
    pub finding: Finding,
    pub severity: Severity,
    pub auto_fixable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_replacement: Option<String>,
    pub fingerprint: String,
}

impl Violation {
    pub fn document_id(&self) -> &str {
        &self.finding.document_id
    }

    pub fn category(&self) -> Category {
        self.finding.category
    }
}

/// A document that could not be loaded
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("Failed to read {id}: {source}")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

impl ReadError {
    pub fn document_id(&self) -> &str {
        match self {
            ReadError::NotFound(id) | ReadError::InvalidUtf8(id) => id,
            ReadError::Io { id, .. } => id,
        }
    }
}

/// Non-fatal problem recorded during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub document_id: String,
    pub message: String,
}

impl From<&ReadError> for ScanWarning {
    fn from(err: &ReadError) -> Self {
        Self {
            document_id: err.document_id().to_string(),
            message: err.to_string(),
        }
    }
}

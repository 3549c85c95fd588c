//! Rewrite plans
//!
//! A plan is a set of byte-range edits against one exact version of one
//! document. Planning is pure: it reads the document and the selected
//! violations and never touches storage.

use std::collections::BTreeMap;

use audit_engine::lines::byte_span;
use audit_engine::rules::markup::{enclosing_tag, Attribute};
use audit_engine::utility::{normalize_declarations, rule_body, style_attribute_value};
use serde::{Deserialize, Serialize};
use shared_types::{hash_document, Category, Document, DocumentKind, Violation};

use crate::apply::apply_edits;
use crate::error::FixError;

/// Replace `start..end` (byte offsets) with `replacement`. An empty range is
/// an insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(at, at, text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewritePlan {
    pub target_document: String,
    pub kind: DocumentKind,
    /// Fingerprint of the content the edits were computed against
    pub base_fingerprint: String,
    /// Fingerprint of the content after the edits
    pub result_fingerprint: String,
    /// Non-overlapping, sorted by start offset
    pub edits: Vec<TextEdit>,
    /// Violations this plan resolves
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fingerprints: Vec<String>,
}

impl RewritePlan {
    /// Build a plan for `document`, validating the edits against it
    pub fn new(
        document: &Document,
        mut edits: Vec<TextEdit>,
        fingerprints: Vec<String>,
    ) -> Result<Self, FixError> {
        edits.sort_by_key(|e| (e.start, e.end));
        let result = apply_edits(&document.id, &document.content, &edits)?;
        Ok(Self {
            target_document: document.id.clone(),
            kind: document.kind,
            base_fingerprint: document.fingerprint.clone(),
            result_fingerprint: hash_document(result.as_bytes()),
            edits,
            fingerprints,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// A utility class rule required by extracted inline styles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityRule {
    pub class: String,
    pub body: String,
}

impl UtilityRule {
    /// Rule an inline-style violation's fix depends on
    pub fn for_violation(violation: &Violation) -> Option<Self> {
        if violation.category() != Category::InlineStyle {
            return None;
        }
        Some(Self {
            class: violation.suggested_replacement.clone()?,
            body: rule_body(style_attribute_value(&violation.finding.raw_text)),
        })
    }

    pub fn to_css(&self) -> String {
        format!(".{} {{ {} }}\n", self.class, self.body)
    }
}

/// Plan for one document plus the utility rules its edits depend on
#[derive(Debug, Clone)]
pub struct DocumentPlan {
    pub plan: RewritePlan,
    pub utility_rules: Vec<UtilityRule>,
}

/// Compute the edits that resolve `violations` in `document`.
///
/// Every violation must belong to `document`, whose content is expected to
/// be the content the violations were found in.
pub fn plan_document(document: &Document, violations: &[&Violation]) -> Result<DocumentPlan, FixError> {
    let mut edits = Vec::new();
    let mut utility_rules = Vec::new();
    let mut fingerprints = Vec::new();

    for violation in violations {
        let (start, end) = locate(document, violation)?;
        let replacement = violation
            .suggested_replacement
            .as_deref()
            .filter(|_| violation.auto_fixable)
            .ok_or_else(|| FixError::NotFixable {
                document: document.id.clone(),
                fingerprint: violation.fingerprint.clone(),
            })?;

        match violation.category() {
            Category::HardcodedColor => edits.push(TextEdit::new(start, end, replacement)),
            Category::InlineStyle => {
                edits.extend(extract_inline_style(document, violation, start, end, replacement)?);
                utility_rules.extend(UtilityRule::for_violation(violation));
            }
            Category::AccessibilityStructural => {
                return Err(FixError::NotFixable {
                    document: document.id.clone(),
                    fingerprint: violation.fingerprint.clone(),
                })
            }
        }
        if !fingerprints.contains(&violation.fingerprint) {
            fingerprints.push(violation.fingerprint.clone());
        }
    }

    Ok(DocumentPlan {
        plan: RewritePlan::new(document, edits, fingerprints)?,
        utility_rules,
    })
}

/// Byte span of a violation, checked against the current content
fn locate(document: &Document, violation: &Violation) -> Result<(usize, usize), FixError> {
    let finding = &violation.finding;
    let invalid = || FixError::InvalidSpan {
        document: document.id.clone(),
        reason: format!("{} does not match the current content", violation.fingerprint),
    };
    // Spans may run over several lines, so only the start is resolved by
    // column and the end follows from the matched text.
    let (start, _) = byte_span(
        &document.content,
        finding.line,
        finding.column_start,
        finding.column_start,
    )
    .ok_or_else(invalid)?;
    let end = start + finding.raw_text.len();
    if document.content.get(start..end) != Some(finding.raw_text.as_str()) {
        return Err(invalid());
    }
    Ok((start, end))
}

/// Markup edits for one `style` attribute at `start..end`.
///
/// Without a class attribute the style attribute becomes `class="..."`.
/// Otherwise the style attribute is dropped and the class appended to the
/// existing list.
fn extract_inline_style(
    document: &Document,
    violation: &Violation,
    start: usize,
    end: usize,
    class: &str,
) -> Result<Vec<TextEdit>, FixError> {
    let content = &document.content;
    let tag = enclosing_tag(content, start).ok_or_else(|| FixError::InvalidSpan {
        document: document.id.clone(),
        reason: format!("{} is not inside a tag", violation.fingerprint),
    })?;

    let Some(existing) = tag.attribute("class") else {
        return Ok(vec![TextEdit::new(start, end, format!("class=\"{class}\""))]);
    };

    let removal_start = content[..start]
        .trim_end_matches(|c: char| c.is_ascii_whitespace())
        .len()
        .max(tag.start);
    let mut edits = vec![TextEdit::new(removal_start, end, "")];
    if let Some(edit) = append_class(existing, class) {
        edits.push(edit);
    }
    Ok(edits)
}

fn append_class(attribute: &Attribute, class: &str) -> Option<TextEdit> {
    match (&attribute.value, attribute.value_end) {
        (Some(value), Some(value_end)) => {
            if value.split_whitespace().any(|c| c == class) {
                None
            } else if attribute.end == value_end {
                // Unquoted value
                Some(TextEdit::new(
                    attribute.start,
                    attribute.end,
                    format!("class=\"{value} {class}\""),
                ))
            } else if value.trim().is_empty() {
                Some(TextEdit::new(attribute.value_start.unwrap_or(value_end), value_end, class))
            } else {
                Some(TextEdit::insert(value_end, format!(" {class}")))
            }
        }
        // Bare `class` with no value
        _ => Some(TextEdit::new(attribute.start, attribute.end, format!("class=\"{class}\""))),
    }
}

/// Append the rules in `rules` that `stylesheet` does not define yet.
///
/// A rule whose class already exists with the same declarations is skipped;
/// with different declarations it is a [`FixError::ClassCollision`].
pub fn plan_utility_rules(stylesheet: &Document, rules: &[UtilityRule]) -> Result<RewritePlan, FixError> {
    let mut wanted: BTreeMap<&str, &UtilityRule> = BTreeMap::new();
    for rule in rules {
        wanted.entry(rule.class.as_str()).or_insert(rule);
    }

    let mut appended = String::new();
    for (class, rule) in wanted {
        match existing_rule_body(&stylesheet.content, class) {
            Some(body) if normalize_declarations(body) == normalize_declarations(&rule.body) => {}
            Some(_) => {
                return Err(FixError::ClassCollision {
                    class: class.to_string(),
                    document: stylesheet.id.clone(),
                })
            }
            None => appended.push_str(&rule.to_css()),
        }
    }

    let mut edits = Vec::new();
    if !appended.is_empty() {
        let content = &stylesheet.content;
        if !content.is_empty() && !content.ends_with('\n') {
            appended.insert(0, '\n');
        }
        edits.push(TextEdit::insert(content.len(), appended));
    }
    RewritePlan::new(stylesheet, edits, Vec::new())
}

/// Declarations of the first `.class { ... }` rule in `css`
fn existing_rule_body<'a>(css: &'a str, class: &str) -> Option<&'a str> {
    let selector = format!(".{class}");
    let mut from = 0;
    while let Some(rel) = css[from..].find(&selector) {
        let start = from + rel;
        let after = start + selector.len();
        from = after;

        let continues_name = css[after..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if continues_name {
            continue;
        }
        let rest = css[after..].trim_start();
        if let Some(block) = rest.strip_prefix('{') {
            return block.find('}').map(|close| &block[..close]);
        }
    }
    None
}

//! Applying rewrite plans to document content

use shared_types::Document;

use crate::error::FixError;
use crate::plan::{RewritePlan, TextEdit};

/// Result of applying a plan to the current version of its document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// New document value carrying the edited content
    Updated(Document),
    /// The document already holds the plan's result
    Unchanged,
}

/// Apply `plan` to `document`.
///
/// Content equal to the plan's result is left alone, which makes applying a
/// plan twice the same as applying it once. Any other content that differs
/// from the plan's base is a [`FixError::Conflict`].
pub fn apply(plan: &RewritePlan, document: &Document) -> Result<Applied, FixError> {
    if document.id != plan.target_document {
        return Err(FixError::Conflict(document.id.clone()));
    }
    if document.fingerprint == plan.result_fingerprint {
        return Ok(Applied::Unchanged);
    }
    if document.fingerprint != plan.base_fingerprint {
        return Err(FixError::Conflict(document.id.clone()));
    }

    let content = apply_edits(&document.id, &document.content, &plan.edits)?;
    Ok(Applied::Updated(document.with_content(content)))
}

/// Apply edits sorted by start offset in one pass.
///
/// Edits must lie on character boundaries and must not overlap. Two
/// insertions at the same offset count as overlapping since their order
/// would be ambiguous.
pub fn apply_edits(document_id: &str, content: &str, edits: &[TextEdit]) -> Result<String, FixError> {
    for edit in edits {
        let valid = edit.start <= edit.end
            && edit.end <= content.len()
            && content.is_char_boundary(edit.start)
            && content.is_char_boundary(edit.end);
        if !valid {
            return Err(FixError::InvalidSpan {
                document: document_id.to_string(),
                reason: format!("edit {}..{} is out of range", edit.start, edit.end),
            });
        }
    }
    for pair in edits.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.end > b.start || a.start == b.start {
            return Err(FixError::OverlappingEdits(document_id.to_string()));
        }
    }

    // Highest offset first keeps earlier offsets valid
    let mut output = content.to_string();
    for edit in edits.iter().rev() {
        output.replace_range(edit.start..edit.end, &edit.replacement);
    }
    Ok(output)
}

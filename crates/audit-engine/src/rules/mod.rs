//! Detection rules, one set per surface syntax

pub mod markup;
pub mod stylesheet;

use shared_types::{Document, DocumentKind, Finding};

/// Run the rule set matching the document's kind
pub fn check_document(document: &Document) -> Vec<Finding> {
    match document.kind {
        DocumentKind::Markup => markup::check_markup(document),
        DocumentKind::Stylesheet => stylesheet::check_stylesheet(document),
    }
}

//! Document scanning
//!
//! Each document is checked independently on the rayon pool. Results are
//! merged with a total order afterwards, so thread scheduling never shows up
//! in the output.

use rayon::prelude::*;
use shared_types::{Document, Finding};

use crate::rules;

/// Extract raw findings from every document
pub fn scan(documents: &[Document]) -> Vec<Finding> {
    let mut findings: Vec<Finding> = documents
        .par_iter()
        .flat_map_iter(|document| {
            let found = rules::check_document(document);
            tracing::debug!(
                document = %document.id,
                kind = ?document.kind,
                findings = found.len(),
                "scanned document"
            );
            found
        })
        .collect();

    sort_findings(&mut findings);
    findings
}

/// Canonical order: document, line, column, then category and text as
/// tie-breakers
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.document_id
            .cmp(&b.document_id)
            .then(a.line.cmp(&b.line))
            .then(a.column_start.cmp(&b.column_start))
            .then(a.category.cmp(&b.category))
            .then(a.rule.cmp(&b.rule))
            .then(a.raw_text.cmp(&b.raw_text))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::DocumentKind;

    fn documents() -> Vec<Document> {
        vec![
            Document::new("b.css", DocumentKind::Stylesheet, "a { color: #fff; }"),
            Document::new(
                "a.html",
                DocumentKind::Markup,
                "<h1>x</h1>\n<h3 style=\"color: #000\">y</h3>",
            ),
        ]
    }

    #[test]
    fn test_scan_orders_by_document_then_position() {
        let findings = scan(&documents());
        let order: Vec<(&str, usize, usize)> = findings
            .iter()
            .map(|f| (f.document_id.as_str(), f.line, f.column_start))
            .collect();

        assert_eq!(
            order,
            vec![("a.html", 2, 0), ("a.html", 2, 4), ("a.html", 2, 18), ("b.css", 1, 11)]
        );
    }

    #[test]
    fn test_scan_is_independent_of_input_order() {
        let mut reversed = documents();
        reversed.reverse();
        assert_eq!(scan(&documents()), scan(&reversed));
    }

    #[test]
    fn test_empty_input() {
        assert!(scan(&[]).is_empty());
    }
}

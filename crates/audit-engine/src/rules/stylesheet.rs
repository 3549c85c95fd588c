//! Stylesheet rules: hardcoded colors in property values
//!
//! Not a CSS parser. Comments and strings are masked out, then the text is
//! split into segments at `{`, `}` and `;`. A segment inside a block that has
//! the shape `property: value` is a declaration; everything else (selectors,
//! at-rule preludes) is skipped.

use shared_types::{Category, Document, DocumentKind, Finding};

use crate::lines::LineIndex;
use crate::patterns::{color_literals, mask_range, PROPERTY_NAME};

pub const RULE_HARDCODED_COLOR: &str = "hardcoded-color";

/// A `property: value` declaration with byte offsets into the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value_start: usize,
    pub value_end: usize,
}

pub fn check_stylesheet(document: &Document) -> Vec<Finding> {
    let Some(masked) = mask_comments_and_strings(&document.content) else {
        tracing::warn!(
            document = %document.id,
            "stylesheet cannot be tokenized (unterminated comment or invalid text), skipping color checks"
        );
        return Vec::new();
    };

    let index = LineIndex::new(&document.content);
    let mut findings = Vec::new();

    for decl in declarations(&masked) {
        let value = &masked[decl.value_start..decl.value_end];
        for (start, end) in color_literals(value) {
            let abs_start = decl.value_start + start;
            let abs_end = decl.value_start + end;
            let raw = &document.content[abs_start..abs_end];
            let (line, column_start) = index.locate(abs_start);

            findings.push(Finding {
                document_id: document.id.clone(),
                kind: DocumentKind::Stylesheet,
                line,
                column_start,
                column_end: column_start + raw.chars().count(),
                raw_text: raw.to_string(),
                category: Category::HardcodedColor,
                rule: RULE_HARDCODED_COLOR.to_string(),
                message: format!("Hardcoded color {raw} in `{}`", decl.property),
            });
        }
    }

    findings
}

/// Copy of `text` with comments and quoted strings blanked out.
///
/// Returns `None` when a comment is never closed; the document cannot be
/// tokenized reliably in that case.
pub fn mask_comments_and_strings(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut masked = bytes.to_vec();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let close = text[i + 2..].find("*/")?;
                let end = i + 2 + close + 2;
                mask_range(&mut masked, i, end);
                i = end;
            }
            quote @ (b'"' | b'\'') => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != quote && bytes[j] != b'\n' {
                    if bytes[j] == b'\\' {
                        j += 1;
                    }
                    j += 1;
                }
                // Unterminated at end of input: mask through the last byte
                let (mask_end, end) = if j < bytes.len() {
                    (j, j + 1)
                } else {
                    (bytes.len(), bytes.len())
                };
                // Keep the quotes so the value still reads as a string
                if mask_end > i + 1 {
                    mask_range(&mut masked, i + 1, mask_end);
                }
                i = end;
            }
            _ => i += 1,
        }
    }

    String::from_utf8(masked).ok()
}

/// Declarations inside blocks of an already-masked stylesheet.
/// Custom property definitions (`--name: ...`) are token definitions and are
/// not returned.
pub fn declarations(masked: &str) -> Vec<Declaration> {
    let bytes = masked.as_bytes();
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut segment_start = 0;

    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'{' => {
                depth += 1;
                segment_start = i + 1;
            }
            b'}' => {
                if depth > 0 {
                    push_declaration(masked, segment_start, i, &mut out);
                }
                depth = depth.saturating_sub(1);
                segment_start = i + 1;
            }
            b';' => {
                if depth > 0 {
                    push_declaration(masked, segment_start, i, &mut out);
                }
                segment_start = i + 1;
            }
            _ => {}
        }
    }

    out
}

fn push_declaration(masked: &str, start: usize, end: usize, out: &mut Vec<Declaration>) {
    let segment = &masked[start..end];
    let Some(colon) = segment.find(':') else {
        return;
    };
    let property = segment[..colon].trim();
    if property.starts_with("--") || !PROPERTY_NAME.is_match(property) {
        return;
    }

    out.push(Declaration {
        property: property.to_ascii_lowercase(),
        value_start: start + colon + 1,
        value_end: end,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn css(content: &str) -> Document {
        Document::new("static/css/main.css", DocumentKind::Stylesheet, content)
    }

    fn raw_texts(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.raw_text.as_str()).collect()
    }

    #[test]
    fn test_detects_color_in_declaration() {
        let findings = check_stylesheet(&css(".card {\n  color: #FFFFFF;\n}\n"));

        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.raw_text, "#FFFFFF");
        assert_eq!(f.line, 2);
        assert_eq!(f.column_start, 9);
        assert_eq!(f.column_end, 16);
        assert_eq!(f.category, Category::HardcodedColor);
    }

    #[test]
    fn test_skips_custom_property_definitions() {
        let findings = check_stylesheet(&css(":root {\n  --primary-color: #4F46E5;\n}\n"));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_skips_token_references() {
        let findings =
            check_stylesheet(&css("a { color: var(--primary-color); border-color: var(--x, #fff); }"));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_skips_id_selectors() {
        let findings = check_stylesheet(&css("#add, #fff { display: none; }"));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_skips_comments_and_strings() {
        let findings = check_stylesheet(&css(
            "/* brand: #4F46E5 */\na { content: \"#fff\"; color: #000; }",
        ));
        assert_eq!(raw_texts(&findings), vec!["#000"]);
    }

    #[test]
    fn test_nested_blocks_and_pseudo_selectors() {
        let findings = check_stylesheet(&css(
            "@media (max-width: 600px) {\n  a:hover { background: rgba(0, 0, 0, 0.5) }\n}\n",
        ));
        assert_eq!(raw_texts(&findings), vec!["rgba(0, 0, 0, 0.5)"]);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn test_multiple_literals_in_one_value() {
        let findings =
            check_stylesheet(&css("a { box-shadow: 0 0 1px #111, 0 0 2px #222222; }"));
        assert_eq!(raw_texts(&findings), vec!["#111", "#222222"]);
        assert!(findings[0].column_start < findings[1].column_start);
    }

    #[test]
    fn test_unterminated_comment_yields_nothing() {
        let findings = check_stylesheet(&css("a { color: #000; } /* never closed"));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_unterminated_string_with_multibyte_tail() {
        let findings = check_stylesheet(&css("a { color: #000; } b { content: \"caf\u{e9}"));
        assert_eq!(raw_texts(&findings), vec!["#000"]);

        let masked = mask_comments_and_strings("b { content: \"\u{e9}").unwrap();
        assert_eq!(masked.len(), "b { content: \"\u{e9}".len());
        assert!(masked.ends_with("\"  "));
    }

    #[test]
    fn test_unbalanced_braces_are_best_effort() {
        let findings = check_stylesheet(&css("}} a { color: #123456; "));
        assert_eq!(raw_texts(&findings), vec!["#123456"]);
    }
}

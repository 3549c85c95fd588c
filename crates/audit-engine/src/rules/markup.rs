//! Markup rules: inline styles, colors inside `style` attributes, and
//! structural accessibility checks (heading order, table headers, image alt
//! text, placeholder links).
//!
//! Tags are matched with a regex over a copy of the document in which
//! comments are blanked out. Template syntax is left alone; anything the tag
//! pattern cannot make sense of is skipped rather than reported.

use shared_types::{Category, Document, DocumentKind, Finding};

use crate::lines::LineIndex;
use crate::patterns::{
    color_literals, mask_range, ATTRIBUTE, PLACEHOLDER_HREFS, RAW_TEXT_ELEMENTS,
    SECTIONING_ELEMENTS, TAG,
};

pub const RULE_INLINE_STYLE: &str = "inline-style";
pub const RULE_HARDCODED_COLOR: &str = "hardcoded-color";
pub const RULE_HEADING_ORDER: &str = "heading-order";
pub const RULE_TABLE_HEADER_SCOPE: &str = "table-header-scope";
pub const RULE_IMG_ALT: &str = "img-alt";
pub const RULE_PLACEHOLDER_LINK: &str = "placeholder-link";

/// One attribute of a tag, with absolute byte offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased name
    pub name: String,
    pub value: Option<String>,
    /// Whole attribute, from the first name byte to the closing quote
    pub start: usize,
    pub end: usize,
    /// Value without quotes
    pub value_start: Option<usize>,
    pub value_end: Option<usize>,
}

/// Parse the attribute section of a tag. `base` is the byte offset of
/// `text` within the document.
pub fn parse_attributes(text: &str, base: usize) -> Vec<Attribute> {
    ATTRIBUTE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4));
            Some(Attribute {
                name: name.as_str().to_ascii_lowercase(),
                value: value.map(|v| v.as_str().to_string()),
                start: base + whole.start(),
                end: base + whole.end(),
                value_start: value.map(|v| base + v.start()),
                value_end: value.map(|v| base + v.end()),
            })
        })
        .collect()
}

/// An opening tag located in a document
#[derive(Debug, Clone)]
pub struct OpenTag {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub attributes: Vec<Attribute>,
}

impl OpenTag {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// The opening tag whose byte range contains `offset`, if any
pub fn enclosing_tag(content: &str, offset: usize) -> Option<OpenTag> {
    let masked = mask_comments(content);
    TAG.captures_iter(&masked).find_map(|caps| {
        let whole = caps.get(0)?;
        if whole.start() > offset || whole.end() <= offset || !caps[1].is_empty() {
            return None;
        }
        let attrs = caps.get(3)?;
        Some(OpenTag {
            name: caps[2].to_ascii_lowercase(),
            start: whole.start(),
            end: whole.end(),
            attributes: parse_attributes(&content[attrs.start()..attrs.end()], attrs.start()),
        })
    })
}

pub fn check_markup(document: &Document) -> Vec<Finding> {
    let content = &document.content;
    let masked = mask_comments(content);
    let index = LineIndex::new(content);
    let mut ctx = Context {
        document,
        index: &index,
        findings: Vec::new(),
    };
    let mut scopes = HeadingScopes::new();
    let mut pos = 0;

    while let Some(caps) = TAG.captures_at(&masked, pos) {
        let Some(whole) = caps.get(0) else { break };
        pos = whole.end();

        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();

        if closing {
            if SECTIONING_ELEMENTS.contains(&name.as_str()) {
                scopes.close(&name);
            }
            continue;
        }

        let Some(attrs) = caps.get(3) else { continue };
        let tag = OpenTag {
            attributes: parse_attributes(&content[attrs.start()..attrs.end()], attrs.start()),
            name,
            start: whole.start(),
            end: whole.end(),
        };

        check_style_attribute(&mut ctx, &tag);
        check_accessibility(&mut ctx, &tag, &mut scopes);

        if SECTIONING_ELEMENTS.contains(&tag.name.as_str()) {
            scopes.open(&tag.name);
        }

        if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str())
            && !tag_text(content, &tag).ends_with("/>")
        {
            let close = format!("</{}", tag.name);
            match masked[pos..].to_ascii_lowercase().find(&close) {
                Some(rel) => pos += rel,
                None => break,
            }
        }
    }

    ctx.findings
}

struct Context<'a> {
    document: &'a Document,
    index: &'a LineIndex<'a>,
    findings: Vec<Finding>,
}

impl Context<'_> {
    fn push(&mut self, start: usize, end: usize, category: Category, rule: &str, message: String) {
        let raw = &self.document.content[start..end];
        let (line, column_start) = self.index.locate(start);
        self.findings.push(Finding {
            document_id: self.document.id.clone(),
            kind: DocumentKind::Markup,
            line,
            column_start,
            column_end: column_start + raw.chars().count(),
            raw_text: raw.to_string(),
            category,
            rule: rule.to_string(),
            message,
        });
    }
}

fn tag_text<'a>(content: &'a str, tag: &OpenTag) -> &'a str {
    &content[tag.start..tag.end]
}

fn check_style_attribute(ctx: &mut Context<'_>, tag: &OpenTag) {
    let Some(style) = tag.attribute("style") else {
        return;
    };
    let (Some(value), Some(value_start)) = (style.value.as_deref(), style.value_start) else {
        return;
    };
    if value.trim().is_empty() {
        return;
    }

    ctx.push(
        style.start,
        style.end,
        Category::InlineStyle,
        RULE_INLINE_STYLE,
        format!("Inline style on <{}>", tag.name),
    );

    for (start, end) in color_literals(value) {
        let raw = &value[start..end];
        ctx.push(
            value_start + start,
            value_start + end,
            Category::HardcodedColor,
            RULE_HARDCODED_COLOR,
            format!("Hardcoded color {raw} in inline style"),
        );
    }
}

fn check_accessibility(ctx: &mut Context<'_>, tag: &OpenTag, scopes: &mut HeadingScopes) {
    match tag.name.as_str() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = usize::from(tag.name.as_bytes()[1] - b'0');
            if !scopes.allows(level) {
                ctx.push(
                    tag.start,
                    tag.end,
                    Category::AccessibilityStructural,
                    RULE_HEADING_ORDER,
                    format!("Heading <h{level}> appears before any <h{}>", level - 1),
                );
            }
            scopes.record(level);
        }
        "th" => {
            let annotated = ["scope", "role"].iter().any(|name| {
                tag.attribute(name)
                    .and_then(|a| a.value.as_deref())
                    .is_some_and(|v| !v.trim().is_empty())
            });
            if !annotated {
                ctx.push(
                    tag.start,
                    tag.end,
                    Category::AccessibilityStructural,
                    RULE_TABLE_HEADER_SCOPE,
                    "Table header missing scope or role attribute".to_string(),
                );
            }
        }
        "img" => {
            if tag.attribute("alt").is_none() {
                ctx.push(
                    tag.start,
                    tag.end,
                    Category::AccessibilityStructural,
                    RULE_IMG_ALT,
                    "Image missing alt attribute".to_string(),
                );
            }
        }
        "a" => {
            let placeholder = tag
                .attribute("href")
                .map(|a| a.value.as_deref().unwrap_or("").trim())
                .is_some_and(|href| PLACEHOLDER_HREFS.contains(&href));
            if placeholder {
                ctx.push(
                    tag.start,
                    tag.end,
                    Category::AccessibilityStructural,
                    RULE_PLACEHOLDER_LINK,
                    "Empty or placeholder link".to_string(),
                );
            }
        }
        _ => {}
    }
}

/// Heading levels seen per sectioning scope, innermost last
struct HeadingScopes {
    stack: Vec<(String, [bool; 7])>,
}

impl HeadingScopes {
    fn new() -> Self {
        Self {
            stack: vec![(String::new(), [false; 7])],
        }
    }

    fn open(&mut self, name: &str) {
        self.stack.push((name.to_string(), [false; 7]));
    }

    /// Pop back to (and including) the innermost scope opened by `name`.
    /// Stray closing tags are ignored.
    fn close(&mut self, name: &str) {
        if let Some(idx) = self.stack.iter().rposition(|(n, _)| n == name) {
            if idx > 0 {
                self.stack.truncate(idx);
            }
        }
    }

    fn allows(&self, level: usize) -> bool {
        level == 1 || self.stack.iter().any(|(_, seen)| seen[level - 1])
    }

    fn record(&mut self, level: usize) {
        if let Some((_, seen)) = self.stack.last_mut() {
            seen[level] = true;
        }
    }
}

/// Blank out `<!-- -->` and `{# #}` comments. An unterminated comment runs to
/// the end of the document.
pub fn mask_comments(content: &str) -> String {
    let mut masked = content.as_bytes().to_vec();
    for (open, close) in [("<!--", "-->"), ("{#", "#}")] {
        let mut from = 0;
        while let Some(rel) = content[from..].find(open) {
            let start = from + rel;
            let end = content[start + open.len()..]
                .find(close)
                .map(|r| start + open.len() + r + close.len())
                .unwrap_or(content.len());
            mask_range(&mut masked, start, end);
            from = end;
        }
    }
    // Only ASCII delimiters bound the masked ranges
    String::from_utf8(masked).unwrap_or_else(|_| content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(content: &str) -> Document {
        Document::new("templates/index.html", DocumentKind::Markup, content)
    }

    fn by_rule<'a>(findings: &'a [Finding], rule: &str) -> Vec<&'a Finding> {
        findings.iter().filter(|f| f.rule == rule).collect()
    }

    #[test]
    fn test_inline_style_detected_once_per_attribute() {
        let findings = check_markup(&html(
            "<div style=\"font-size:0.7rem; margin: 0;\">x</div>\n<p style=''>y</p>",
        ));
        let styles = by_rule(&findings, RULE_INLINE_STYLE);

        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].raw_text, "style=\"font-size:0.7rem; margin: 0;\"");
        assert_eq!(styles[0].line, 1);
        assert_eq!(styles[0].column_start, 5);
        assert_eq!(styles[0].category, Category::InlineStyle);
    }

    #[test]
    fn test_colors_inside_style_attribute() {
        let findings = check_markup(&html(
            "<span style=\"color: #4F46E5; background: var(--x)\">a</span>",
        ));
        let colors = by_rule(&findings, RULE_HARDCODED_COLOR);

        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].raw_text, "#4F46E5");
        assert_eq!(colors[0].column_start, 20);
        assert_eq!(colors[0].kind, DocumentKind::Markup);
    }

    #[test]
    fn test_colors_outside_style_attribute_ignored() {
        let findings = check_markup(&html("<p>Use #4F46E5 for links</p><a href=\"#fff\">x</a>"));
        assert!(by_rule(&findings, RULE_HARDCODED_COLOR).is_empty());
    }

    #[test]
    fn test_heading_skip_flagged_at_skipping_heading() {
        let findings = check_markup(&html("<h1>Title</h1>\n<h3>Sub</h3>\n"));
        let headings = by_rule(&findings, RULE_HEADING_ORDER);

        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].raw_text, "<h3>");
        assert_eq!(headings[0].line, 2);
        assert_eq!(headings[0].category, Category::AccessibilityStructural);
    }

    #[test]
    fn test_heading_order_respects_ancestor_scopes() {
        let findings = check_markup(&html(
            "<h1>A</h1><section><h2>B</h2><article><h3>C</h3></article></section>",
        ));
        assert!(by_rule(&findings, RULE_HEADING_ORDER).is_empty());
    }

    #[test]
    fn test_sibling_scope_does_not_leak() {
        // The h2 inside the first section does not license the h3 in the second
        let findings = check_markup(&html(
            "<h1>A</h1><section><h2>B</h2></section><section><h3>C</h3></section>",
        ));
        assert_eq!(by_rule(&findings, RULE_HEADING_ORDER).len(), 1);
    }

    #[test]
    fn test_table_header_without_scope() {
        let findings = check_markup(&html(
            "<table><tr><th>Name</th><th scope=\"col\">Age</th><th role=\"rowheader\">X</th></tr></table>",
        ));
        let headers = by_rule(&findings, RULE_TABLE_HEADER_SCOPE);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].raw_text, "<th>");
    }

    #[test]
    fn test_img_alt_and_placeholder_links() {
        let findings = check_markup(&html(
            "<img src=\"a.png\"><img src=\"b.png\" alt=\"\">\n<a href=\"#\">x</a><a href=\"/ok\">y</a><a name=\"top\"></a>",
        ));

        assert_eq!(by_rule(&findings, RULE_IMG_ALT).len(), 1);
        let links = by_rule(&findings, RULE_PLACEHOLDER_LINK);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].line, 2);
    }

    #[test]
    fn test_comments_and_scripts_ignored() {
        let findings = check_markup(&html(
            "<!-- <div style=\"color:#fff\"></div> -->\n<script>let s = '<h4 style=\"x\">';</script>\n<h1>ok</h1>",
        ));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_multiline_tag_keeps_start_location() {
        let findings = check_markup(&html("<div\n  class=\"a\"\n  style=\"color: red\">x</div>"));
        let styles = by_rule(&findings, RULE_INLINE_STYLE);

        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].line, 3);
        assert_eq!(styles[0].column_start, 2);
    }

    #[test]
    fn test_enclosing_tag_lookup() {
        let content = "<p>a</p><div class=\"x\" style=\"color: red\">b</div>";
        let offset = content.find("style").unwrap();
        let tag = enclosing_tag(content, offset).unwrap();

        assert_eq!(tag.name, "div");
        assert_eq!(tag.attribute("class").and_then(|a| a.value.as_deref()), Some("x"));
        assert!(enclosing_tag(content, 1).is_some());
        assert!(enclosing_tag(content, 3).is_none());
    }
}

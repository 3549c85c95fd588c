//! Regex patterns and low-level matching helpers shared by the rule sets

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// 3, 6 or 8 digit hex color. Alternation is leftmost-first, so the
    /// longest form wins and the trailing `\b` rejects 4/5/7 digit runs.
    pub static ref HEX_COLOR: Regex =
        Regex::new(r"#(?:[0-9a-fA-F]{8}|[0-9a-fA-F]{6}|[0-9a-fA-F]{3})\b").unwrap();

    /// Functional `rgb()` / `rgba()` color
    pub static ref RGB_COLOR: Regex = Regex::new(r"(?i)\brgba?\([^()]*\)").unwrap();

    /// Opening or closing markup tag; quoted attribute values may contain `>`
    pub static ref TAG: Regex =
        Regex::new(r#"<(/?)([a-zA-Z][a-zA-Z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#).unwrap();

    /// One attribute inside a tag, with an optional quoted or bare value
    pub static ref ATTRIBUTE: Regex = Regex::new(
        r#"([a-zA-Z_:@][-a-zA-Z0-9_:.@]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#
    )
    .unwrap();

    /// CSS property name at the start of a declaration
    pub static ref PROPERTY_NAME: Regex = Regex::new(r"^-?[a-zA-Z_][a-zA-Z0-9_-]*$").unwrap();
}

/// Elements that open a new heading scope
pub const SECTIONING_ELEMENTS: &[&str] = &[
    "body", "main", "section", "article", "aside", "nav", "header", "footer", "dialog",
];

/// Elements whose content is not markup
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

/// Link targets that lead nowhere
pub const PLACEHOLDER_HREFS: &[&str] = &["", "#", "javascript:void(0)", "javascript:void(0);"];

/// Byte ranges covered by `name(...)` calls, including nested parentheses.
/// `name` must be lowercase and include the opening parenthesis.
pub fn call_spans(text: &str, name: &str) -> Vec<(usize, usize)> {
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut spans = Vec::new();
    let mut search_from = 0;

    while let Some(rel) = lower[search_from..].find(name) {
        let start = search_from + rel;
        let mut depth = 0usize;
        let mut end = bytes.len();
        for (i, b) in bytes.iter().enumerate().skip(start + name.len() - 1) {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }
        spans.push((start, end));
        search_from = end;
    }

    spans
}

/// Byte ranges of color literals in `text`, excluding anything inside a
/// `var()` reference or a `url()` fragment. Sorted by start offset.
pub fn color_literals(text: &str) -> Vec<(usize, usize)> {
    let mut excluded = call_spans(text, "var(");
    excluded.extend(call_spans(text, "url("));
    let is_excluded = |start: usize| excluded.iter().any(|(s, e)| start >= *s && start < *e);

    let mut spans: Vec<(usize, usize)> = HEX_COLOR
        .find_iter(text)
        .chain(RGB_COLOR.find_iter(text))
        .map(|m| (m.start(), m.end()))
        .filter(|(start, _)| !is_excluded(*start))
        .collect();

    spans.sort_unstable();
    spans
}

/// Replace every byte in `range` except newlines with a space.
///
/// Masking keeps byte offsets and line numbers intact while hiding comments
/// and strings from the pattern rules. Multi-byte characters become several
/// spaces, which leaves the buffer valid UTF-8.
pub fn mask_range(buf: &mut [u8], start: usize, end: usize) {
    for b in &mut buf[start..end] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

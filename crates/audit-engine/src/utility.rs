//! Utility classes derived from inline style declarations
//!
//! The class name depends only on the normalized declarations, so the same
//! style yields the same class on every scan and in every document.

use sha2::{Digest, Sha256};

/// Number of hex digits of the declaration hash kept in the class name
const HASH_LEN: usize = 8;

/// The value of a `style="..."` attribute as written in source
pub fn style_attribute_value(attribute: &str) -> &str {
    let Some((_, rest)) = attribute.split_once('=') else {
        return "";
    };
    let rest = rest.trim();
    rest.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')))
        .unwrap_or(rest)
}

/// Canonical form of a declaration list: lowercase properties, single
/// spaces inside values, no empty declarations, `;`-joined.
pub fn normalize_declarations(style: &str) -> String {
    style
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            if property.is_empty() || value.is_empty() {
                return None;
            }
            Some(format!("{property}:{value}"))
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Declarations as they go into the generated rule body
pub fn rule_body(style: &str) -> String {
    let trimmed = style.trim();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{trimmed};")
    }
}

/// `<prefix>-<hash>` where the prefix hints at the first property
pub fn utility_class_name(style: &str) -> String {
    let normalized = normalize_declarations(style);
    let digest = hex::encode(Sha256::digest(normalized.as_bytes()));
    let first_property = normalized.split(':').next().unwrap_or_default();
    format!("{}-{}", class_prefix(first_property), &digest[..HASH_LEN])
}

fn class_prefix(property: &str) -> &'static str {
    let p = property.trim_start_matches('-');
    if p.starts_with("font") || p.starts_with("text") || p == "line-height" || p == "letter-spacing" {
        "text"
    } else if p == "color" {
        "fg"
    } else if p.starts_with("background") {
        "bg"
    } else if p.starts_with("margin") {
        "m"
    } else if p.starts_with("padding") {
        "p"
    } else if p.starts_with("border") || p.starts_with("outline") {
        "border"
    } else if p == "width" || p == "height" || p.starts_with("min-") || p.starts_with("max-") {
        "size"
    } else if p == "display"
        || p.starts_with("flex")
        || p.starts_with("grid")
        || p.starts_with("align")
        || p.starts_with("justify")
        || p == "gap"
    {
        "layout"
    } else {
        "u"
    }
}

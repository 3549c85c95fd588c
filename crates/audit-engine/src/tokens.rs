//! Canonical color -> design token mapping
//!
//! The table is built once at startup and shared read-only (usually behind an
//! `Arc`). Every lookup goes through [`normalize_color`], so `#FFF`, `#fff`
//! and `#FFFFFF` all resolve to the same entry.

use std::collections::BTreeMap;

use thiserror::Error;

/// Default brand palette, used when no `[tokens]` table is configured
pub const BUILTIN_TOKENS: &[(&str, &str)] = &[
    ("#4F46E5", "--primary-color"),
    ("#4338CA", "--primary-hover"),
    ("#64748B", "--secondary-color"),
    ("#10B981", "--success-color"),
    ("#F59E0B", "--warning-color"),
    ("#EF4444", "--danger-color"),
    ("#0EA5E9", "--info-color"),
    ("#F3F4F6", "--light-bg"),
    ("#1F2937", "--dark-text"),
    ("#6B7280", "--muted-text"),
    ("#E5E7EB", "--border-color"),
    ("#2C1863", "--amplitude-color"),
    ("#00BFA5", "--insider-color"),
    ("#4285F4", "--gtm-color"),
    ("#FFFFFF", "white"),
    ("#000000", "black"),
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenTableError {
    #[error("Not a color literal: {0}")]
    InvalidLiteral(String),

    #[error("Color {value} already maps to {existing}, cannot also map to {token}")]
    DuplicateValue {
        value: String,
        existing: String,
        token: String,
    },

    #[error("Empty token name for {0}")]
    EmptyToken(String),
}

/// Ordered mapping of normalized color values to token names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTable {
    by_value: BTreeMap<String, String>,
    by_token: BTreeMap<String, String>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in palette
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (literal, token) in BUILTIN_TOKENS {
            // Built-in literals are distinct and well formed
            let _ = table.insert(literal, token);
        }
        table
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, TokenTableError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut table = Self::new();
        for (literal, token) in pairs {
            table.insert(literal.as_ref(), token.as_ref())?;
        }
        Ok(table)
    }

    /// Add a mapping. Re-inserting the same pair is accepted; mapping one
    /// value to two different tokens is rejected.
    pub fn insert(&mut self, literal: &str, token: &str) -> Result<(), TokenTableError> {
        let value = normalize_color(literal)
            .ok_or_else(|| TokenTableError::InvalidLiteral(literal.to_string()))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenTableError::EmptyToken(literal.to_string()));
        }

        if let Some(existing) = self.by_value.get(&value) {
            if existing == token {
                return Ok(());
            }
            return Err(TokenTableError::DuplicateValue {
                value,
                existing: existing.clone(),
                token: token.to_string(),
            });
        }

        self.by_token
            .entry(token.to_string())
            .or_insert_with(|| value.clone());
        self.by_value.insert(value, token.to_string());
        Ok(())
    }

    /// Token name for a raw literal in any supported spelling
    pub fn lookup(&self, literal: &str) -> Option<&str> {
        let value = normalize_color(literal)?;
        self.by_value.get(&value).map(String::as_str)
    }

    /// Normalized color value bound to a token name
    pub fn value_for(&self, token: &str) -> Option<&str> {
        self.by_token.get(token).map(String::as_str)
    }

    /// Reference syntax that replaces `literal` in source, if mapped
    pub fn reference(&self, literal: &str) -> Option<String> {
        self.lookup(literal).map(token_reference)
    }

    pub fn len(&self) -> usize {
        self.by_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_value.is_empty()
    }

    /// Entries in normalized-value order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_value.iter().map(|(v, t)| (v.as_str(), t.as_str()))
    }
}

/// `--name` becomes `var(--name)`; keyword tokens such as `white` are used as-is
pub fn token_reference(token: &str) -> String {
    if token.starts_with("--") {
        format!("var({token})")
    } else {
        token.to_string()
    }
}

/// Canonical spelling of a color literal.
///
/// Hex is lowercased and 3-digit forms are expanded. Fully opaque 8-digit hex
/// and `rgb()`/`rgba()` with alpha 1 collapse to 6-digit hex. Translucent
/// functional colors become `rgba(r,g,b,a)` without whitespace.
pub fn normalize_color(raw: &str) -> Option<String> {
    let lower = raw.trim().to_ascii_lowercase();

    if let Some(digits) = lower.strip_prefix('#') {
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return match digits.len() {
            3 => {
                let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
                Some(format!("#{expanded}"))
            }
            6 => Some(format!("#{digits}")),
            8 if digits.ends_with("ff") => Some(format!("#{}", &digits[..6])),
            8 => Some(format!("#{digits}")),
            _ => None,
        };
    }

    let inner = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))?
        .strip_suffix(')')?;

    match parse_rgb_components(inner) {
        Some((r, g, b, alpha)) if alpha >= 1.0 => Some(format!("#{r:02x}{g:02x}{b:02x}")),
        Some((r, g, b, alpha)) => Some(format!("rgba({r},{g},{b},{alpha})")),
        // Unparseable arguments (e.g. template expressions) still get a
        // stable spelling so duplicates line up
        None => Some(format!(
            "rgb({})",
            inner.chars().filter(|c| !c.is_whitespace()).collect::<String>()
        )),
    }
}

fn parse_rgb_components(inner: &str) -> Option<(u8, u8, u8, f64)> {
    let parts: Vec<&str> = inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }

    let channel = |s: &str| -> Option<u8> {
        if let Some(pct) = s.strip_suffix('%') {
            let v: f64 = pct.parse().ok()?;
            if !(0.0..=100.0).contains(&v) {
                return None;
            }
            Some((v * 255.0 / 100.0).round() as u8)
        } else {
            let v: f64 = s.parse().ok()?;
            if !(0.0..=255.0).contains(&v) {
                return None;
            }
            Some(v.round() as u8)
        }
    };

    let r = channel(parts[0])?;
    let g = channel(parts[1])?;
    let b = channel(parts[2])?;

    let alpha = match parts.get(3) {
        None => 1.0,
        Some(a) => {
            let v: f64 = match a.strip_suffix('%') {
                Some(pct) => pct.parse::<f64>().ok()? / 100.0,
                None => a.parse().ok()?,
            };
            if !(0.0..=1.0).contains(&v) {
                return None;
            }
            v
        }
    };

    Some((r, g, b, alpha))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hex_spellings() {
        assert_eq!(normalize_color("#fff").as_deref(), Some("#ffffff"));
        assert_eq!(normalize_color("#FFF").as_deref(), Some("#ffffff"));
        assert_eq!(normalize_color("#FFFFFF").as_deref(), Some("#ffffff"));
        assert_eq!(normalize_color("#FFFFFFFF").as_deref(), Some("#ffffff"));
        assert_eq!(normalize_color("#00000080").as_deref(), Some("#00000080"));
    }

    #[test]
    fn test_normalize_rejects_non_colors() {
        assert_eq!(normalize_color("#ffff"), None);
        assert_eq!(normalize_color("#ggg"), None);
        assert_eq!(normalize_color("red"), None);
        assert_eq!(normalize_color("var(--x)"), None);
    }

    #[test]
    fn test_normalize_functional_colors() {
        assert_eq!(
            normalize_color("rgb(255, 255, 255)").as_deref(),
            Some("#ffffff")
        );
        assert_eq!(
            normalize_color("RGBA(79,70,229,1)").as_deref(),
            Some("#4f46e5")
        );
        assert_eq!(
            normalize_color("rgba(0, 0, 0, 0.5)").as_deref(),
            Some("rgba(0,0,0,0.5)")
        );
        assert_eq!(
            normalize_color("rgb(0 0 0 / 50%)").as_deref(),
            Some("rgba(0,0,0,0.5)")
        );
    }

    #[test]
    fn test_lookup_is_spelling_insensitive() {
        let table = TokenTable::from_pairs([("#ffffff", "--color-surface")]).unwrap();

        assert_eq!(table.lookup("#FFF"), Some("--color-surface"));
        assert_eq!(table.lookup("#ffffff"), Some("--color-surface"));
        assert_eq!(table.lookup("rgb(255,255,255)"), Some("--color-surface"));
        assert_eq!(table.lookup("#000"), None);
    }

    #[test]
    fn test_reverse_lookup() {
        let table = TokenTable::from_pairs([("#4F46E5", "--primary-color")]).unwrap();
        assert_eq!(table.value_for("--primary-color"), Some("#4f46e5"));
        assert_eq!(table.value_for("--missing"), None);
    }

    #[test]
    fn test_duplicate_value_rejected() {
        let err = TokenTable::from_pairs([("#fff", "--a"), ("#FFFFFF", "--b")]).unwrap_err();
        assert!(matches!(err, TokenTableError::DuplicateValue { .. }));

        // Same pair twice is fine
        let table = TokenTable::from_pairs([("#fff", "--a"), ("#FFFFFF", "--a")]).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_invalid_literal_rejected() {
        let err = TokenTable::from_pairs([("blue", "--a")]).unwrap_err();
        assert_eq!(err, TokenTableError::InvalidLiteral("blue".to_string()));
    }

    #[test]
    fn test_reference_syntax() {
        let table = TokenTable::builtin();
        assert_eq!(
            table.reference("#4f46e5").as_deref(),
            Some("var(--primary-color)")
        );
        assert_eq!(table.reference("#fff").as_deref(), Some("white"));
        assert_eq!(table.reference("#123456"), None);
    }

    #[test]
    fn test_builtin_table_complete() {
        assert_eq!(TokenTable::builtin().len(), BUILTIN_TOKENS.len());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: case never changes the normalized value
        #[test]
        fn normalization_ignores_case(hex in "[0-9a-fA-F]{6}") {
            let lower = normalize_color(&format!("#{}", hex.to_lowercase()));
            let upper = normalize_color(&format!("#{}", hex.to_uppercase()));
            prop_assert_eq!(lower, upper);
        }

        /// Property: short hex equals its doubled long form
        #[test]
        fn short_hex_expands(r in "[0-9a-f]", g in "[0-9a-f]", b in "[0-9a-f]") {
            let short = normalize_color(&format!("#{r}{g}{b}"));
            let long = normalize_color(&format!("#{r}{r}{g}{g}{b}{b}"));
            prop_assert_eq!(short, long);
        }

        /// Property: rgb() and hex spellings agree
        #[test]
        fn rgb_matches_hex(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255) {
            let functional = normalize_color(&format!("rgb({r}, {g}, {b})"));
            let hex = normalize_color(&format!("#{r:02X}{g:02X}{b:02X}"));
            prop_assert_eq!(functional, hex);
        }

        /// Property: normalization is idempotent
        #[test]
        fn normalization_idempotent(hex in "#[0-9a-fA-F]{3}|#[0-9a-fA-F]{6}|#[0-9a-fA-F]{8}") {
            let once = normalize_color(&hex).unwrap();
            let twice = normalize_color(&once).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}

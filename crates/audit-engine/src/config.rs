//! Configuration parsing for audit runs
//!
//! An `audit.toml` file names the token table, where documents live, where
//! extracted utility classes go, and where reports are written. Every section
//! is optional.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};

use crate::tokens::TokenTable;

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "audit.toml";

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Literal -> token name. Replaces the built-in table when present.
    #[serde(default)]
    pub tokens: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub fix: FixConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl AuditConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// ```
    /// use audit_engine::config::AuditConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = AuditConfig::from_str(r##"
    ///     [tokens]
    ///     "#FFFFFF" = "--color-surface"
    /// "##)?;
    /// assert_eq!(config.token_table()?.len(), 1);
    /// # Ok(())
    /// # }
    /// # example().unwrap();
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Build the token table, falling back to the built-in brand colors
    pub fn token_table(&self) -> anyhow::Result<TokenTable> {
        match &self.tokens {
            Some(pairs) => TokenTable::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .context("Invalid [tokens] table"),
            None => Ok(TokenTable::builtin()),
        }
    }
}

/// Where documents are discovered, relative to `root`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_markup_dirs")]
    pub markup_dirs: Vec<PathBuf>,
    #[serde(default = "default_stylesheet_dirs")]
    pub stylesheet_dirs: Vec<PathBuf>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            markup_dirs: default_markup_dirs(),
            stylesheet_dirs: default_stylesheet_dirs(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_markup_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("templates")]
}

fn default_stylesheet_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("static/css")]
}

/// Fixer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixConfig {
    /// Stylesheet (document id, relative to the source root) receiving
    /// extracted utility classes
    #[serde(default = "default_utility_stylesheet")]
    pub utility_stylesheet: String,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            utility_stylesheet: default_utility_stylesheet(),
        }
    }
}

fn default_utility_stylesheet() -> String {
    "static/css/utilities.css".to_string()
}

/// Report sink locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_json_report")]
    pub json: PathBuf,
    /// Markdown summary, written alongside the JSON report. `markdown = false`
    /// or an empty path turns it off; `true` keeps the default location.
    #[serde(
        default = "default_markdown_report",
        deserialize_with = "deserialize_markdown",
        skip_serializing_if = "Option::is_none"
    )]
    pub markdown: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            json: default_json_report(),
            markdown: default_markdown_report(),
        }
    }
}

fn default_json_report() -> PathBuf {
    PathBuf::from("audit_report.json")
}

fn default_markdown_report() -> Option<PathBuf> {
    Some(PathBuf::from("AUDIT_SUMMARY.md"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MarkdownSetting {
    Enabled(bool),
    Path(PathBuf),
}

fn deserialize_markdown<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match MarkdownSetting::deserialize(deserializer)? {
        MarkdownSetting::Enabled(true) => default_markdown_report(),
        MarkdownSetting::Path(path) if !path.as_os_str().is_empty() => Some(path),
        MarkdownSetting::Enabled(false) | MarkdownSetting::Path(_) => None,
    })
}

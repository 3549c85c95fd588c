//! Document discovery under the configured source directories

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use audit_engine::config::SourcesConfig;
use shared_types::DocumentKind;

/// Every markup and stylesheet document under the configured directories,
/// as `(id, kind)` pairs sorted by id. Ids are `/`-separated and relative to
/// the source root. Missing directories contribute nothing.
pub fn discover(sources: &SourcesConfig) -> anyhow::Result<Vec<(String, DocumentKind)>> {
    let mut found = Vec::new();
    let groups = [
        (&sources.markup_dirs, DocumentKind::Markup),
        (&sources.stylesheet_dirs, DocumentKind::Stylesheet),
    ];

    for (dirs, kind) in groups {
        for dir in dirs {
            let mut files = Vec::new();
            collect_files(&sources.root.join(dir), &mut files)?;
            for file in files {
                if DocumentKind::from_path(&file) != Some(kind) {
                    continue;
                }
                if let Some(id) = document_id(&sources.root, &file) {
                    found.push((id, kind));
                }
            }
        }
    }

    found.sort();
    found.dedup();
    tracing::debug!(documents = found.len(), "discovered documents");
    Ok(found)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read {}", dir.display()))?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// `root`-relative id with `/` separators
fn document_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

//! Document storage
//!
//! The engine never touches the filesystem directly. Documents are read and
//! written through a [`DocumentStore`]; [`Workspace`] pairs a store with the
//! per-document locks the fixer runs under.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use rayon::prelude::*;
use shared_types::{Document, DocumentKind, ReadError, ScanWarning};

use crate::locks::DocumentLocks;

pub trait DocumentStore: Send + Sync {
    /// Load the current content of `id`
    fn read(&self, id: &str, kind: DocumentKind) -> Result<Document, ReadError>;

    /// Replace the content of `document.id`. Either the whole new content is
    /// stored or nothing is.
    fn write(&self, document: &Document) -> io::Result<()>;
}

/// Documents are files under a root directory; ids are `/`-separated paths
/// relative to it
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, id: &str) -> PathBuf {
        id.split('/').fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl DocumentStore for FsStore {
    fn read(&self, id: &str, kind: DocumentKind) -> Result<Document, ReadError> {
        let bytes = fs::read(self.path_of(id)).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ReadError::NotFound(id.to_string()),
            _ => ReadError::Io {
                id: id.to_string(),
                source,
            },
        })?;
        let content = String::from_utf8(bytes).map_err(|_| ReadError::InvalidUtf8(id.to_string()))?;
        Ok(Document::new(id, kind, content))
    }

    /// Written to a temporary file in the target directory, then renamed
    /// over the target.
    fn write(&self, document: &Document) -> io::Result<()> {
        let path = self.path_of(&document.id);
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(document.content.as_bytes())?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-memory store for tests and embedding
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(id, content);
        self
    }

    pub fn insert(&self, id: impl Into<String>, content: impl Into<String>) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), content.into());
    }

    pub fn content(&self, id: &str) -> Option<String> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn remove(&self, id: &str) -> Option<String> {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, id: &str, kind: DocumentKind) -> Result<Document, ReadError> {
        self.content(id)
            .map(|content| Document::new(id, kind, content))
            .ok_or_else(|| ReadError::NotFound(id.to_string()))
    }

    fn write(&self, document: &Document) -> io::Result<()> {
        self.insert(document.id.clone(), document.content.clone());
        Ok(())
    }
}

/// A document store plus the locks that serialize work per document
pub struct Workspace<S> {
    store: S,
    locks: DocumentLocks,
}

impl<S: DocumentStore> Workspace<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: DocumentLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn locks(&self) -> &DocumentLocks {
        &self.locks
    }

    pub fn load(&self, id: &str, kind: DocumentKind) -> Result<Document, ReadError> {
        self.store.read(id, kind)
    }

    /// Load a document set for scanning. Documents that fail to load become
    /// warnings; the rest keep their input order.
    pub fn load_all(&self, sources: &[(String, DocumentKind)]) -> (Vec<Document>, Vec<ScanWarning>) {
        let results: Vec<Result<Document, ReadError>> = sources
            .par_iter()
            .map(|(id, kind)| self.load(id, *kind))
            .collect();

        let mut documents = Vec::with_capacity(results.len());
        let mut warnings = Vec::new();
        for result in results {
            match result {
                Ok(document) => documents.push(document),
                Err(err) => {
                    tracing::warn!(document = %err.document_id(), error = %err, "skipping document");
                    warnings.push(ScanWarning::from(&err));
                }
            }
        }
        (documents, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::hash_document;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new().with("a.css", "a {}");
        let doc = store.read("a.css", DocumentKind::Stylesheet).unwrap();
        assert_eq!(doc.fingerprint, hash_document(b"a {}"));

        store.write(&doc.with_content("b {}")).unwrap();
        assert_eq!(store.content("a.css").as_deref(), Some("b {}"));
        assert!(matches!(
            store.read("missing.css", DocumentKind::Stylesheet),
            Err(ReadError::NotFound(_))
        ));
    }

    #[test]
    fn test_fs_store_read_write() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("static/css")).unwrap();
        fs::write(dir.path().join("static/css/main.css"), "a { color: #fff; }").unwrap();
        let store = FsStore::new(dir.path());

        let doc = store.read("static/css/main.css", DocumentKind::Stylesheet).unwrap();
        assert_eq!(doc.content, "a { color: #fff; }");

        store.write(&doc.with_content("a { color: white; }")).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("static/css/main.css")).unwrap(),
            "a { color: white; }"
        );
    }

    #[test]
    fn test_fs_store_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let doc = Document::new("static/css/utilities.css", DocumentKind::Stylesheet, ".u {}\n");

        store.write(&doc).unwrap();
        assert!(dir.path().join("static/css/utilities.css").exists());
    }

    #[test]
    fn test_fs_store_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.html"), [0xff, 0xfe, 0x00]).unwrap();
        let store = FsStore::new(dir.path());

        assert!(matches!(
            store.read("bad.html", DocumentKind::Markup),
            Err(ReadError::InvalidUtf8(_))
        ));
        assert!(matches!(
            store.read("nope.html", DocumentKind::Markup),
            Err(ReadError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_all_collects_warnings() {
        let workspace = Workspace::new(MemoryStore::new().with("a.html", "<p>").with("c.css", ""));
        let sources = vec![
            ("c.css".to_string(), DocumentKind::Stylesheet),
            ("b.html".to_string(), DocumentKind::Markup),
            ("a.html".to_string(), DocumentKind::Markup),
        ];

        let (documents, warnings) = workspace.load_all(&sources);

        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c.css", "a.html"]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].document_id, "b.html");
    }
}

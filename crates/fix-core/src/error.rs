use shared_types::ReadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixError {
    #[error("Document {0} changed since the report was generated")]
    Conflict(String),

    #[error("Violation {fingerprint} in {document} is not auto-fixable")]
    NotFixable {
        document: String,
        fingerprint: String,
    },

    #[error("No violation with fingerprint {0}")]
    NotFound(String),

    #[error("Document {0} is not part of the report")]
    UnknownDocument(String),

    #[error("Class .{class} already exists in {document} with different declarations")]
    ClassCollision { class: String, document: String },

    #[error("Overlapping edits in {0}")]
    OverlappingEdits(String),

    #[error("Invalid span in {document}: {reason}")]
    InvalidSpan { document: String, reason: String },

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("Failed to write {document}: {source}")]
    Io {
        document: String,
        #[source]
        source: std::io::Error,
    },
}

impl FixError {
    /// Document the error is about, when there is one
    pub fn document(&self) -> Option<&str> {
        match self {
            FixError::Conflict(doc)
            | FixError::UnknownDocument(doc)
            | FixError::OverlappingEdits(doc) => Some(doc),
            FixError::NotFixable { document, .. }
            | FixError::ClassCollision { document, .. }
            | FixError::InvalidSpan { document, .. }
            | FixError::Io { document, .. } => Some(document),
            FixError::Read(err) => Some(err.document_id()),
            FixError::NotFound(_) => None,
        }
    }
}

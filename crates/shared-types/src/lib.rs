pub mod fingerprint;
pub mod types;

pub use fingerprint::{hash_document, violation_fingerprint};
pub use types::{
    Category, Document, DocumentKind, Finding, ReadError, ScanWarning, Severity, Violation,
};

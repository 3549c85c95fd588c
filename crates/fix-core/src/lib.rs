//! Automatic fixes for audit violations
//!
//! Fixes are planned against the content a report was built from and
//! applied only if that content is still current:
//! - `plan`: pure edit planning (`RewritePlan`, utility class rules)
//! - `apply`: applying plans, with no-op detection for repeated application
//! - `fixer`: per-document orchestration under exclusive sections

pub mod apply;
pub mod error;
pub mod fixer;
pub mod locks;
pub mod plan;
pub mod selector;
pub mod store;

pub use apply::{apply, apply_edits, Applied};
pub use error::FixError;
pub use fixer::{DocumentOutcome, FixMode, FixStatus, FixSummary, Fixer, DEFAULT_UTILITY_STYLESHEET};
pub use locks::DocumentLocks;
pub use plan::{plan_document, plan_utility_rules, RewritePlan, TextEdit, UtilityRule};
pub use selector::Selector;
pub use store::{DocumentStore, FsStore, MemoryStore, Workspace};

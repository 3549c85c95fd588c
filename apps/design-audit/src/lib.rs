//! Command-line front end for the design audit
//!
//! Discovers documents under the configured source directories, runs the
//! audit engine over them and drives the fixer from the persisted report.

pub mod commands;
pub mod discover;

pub use discover::discover;

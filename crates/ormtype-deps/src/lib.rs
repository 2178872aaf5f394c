//! Dependency tracking and the on-disk report.
//!
//! The host checker invalidates by file content, not semantics. This crate
//! computes each model module's dependency set from inheritance, relations,
//! and imports, and persists a content-addressed report whose files change
//! bytes exactly when a module's dependencies change. The tracker also
//! detects registry drift (applications added or removed mid-session) and
//! drives the refresh cycle.

pub mod finder;
pub use finder::DepFinder;

pub mod report;
pub use report::{ReportError, ReportStore, MANIFEST_NAME};

pub mod tracker;
pub use tracker::{Dep, DepTracker, DepsError, RecomputeOutcome};

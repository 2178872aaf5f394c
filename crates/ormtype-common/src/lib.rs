//! Common types and utilities for the ormtype checker plugin.
//!
//! This crate provides the foundational types used across all ormtype crates:
//! - Well-known fullnames and the special annotation identities
//! - The exchange type representation (`TypeRef`)
//! - Resolution outcomes (`Outcome`) and the restart fault
//! - Diagnostics reported through the host checker
//! - The host-checker seam (`HostLookup`, `HostApi`, `ClassInfo`)
//! - Stable content hashing for persisted state

// Well-known fullnames and annotation identities
pub mod fullnames;
pub use fullnames::KnownAnnotation;

// Exchange type representation between the plugin and the host checker
pub mod typeref;
pub use typeref::TypeRef;

// Diagnostics - reported at the hook boundary only
pub mod diagnostics;
pub use diagnostics::{Diagnostic, Location};

// Three-state resolution outcome and the restart fault
pub mod outcome;
pub use outcome::{Outcome, RestartRequired};

// Host-checker seam
pub mod host;
pub use host::{ClassInfo, HostApi, HostLookup};

// Stable content hashing
pub mod hashing;

// Shared test fixtures (fake host)
pub mod testing;

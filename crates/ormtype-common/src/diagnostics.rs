//! Diagnostics surfaced through the host checker.
//!
//! Components never talk to the host's reporting channel directly; they
//! return a `Diagnostic` (usually inside `Outcome::Failed`) and the hook
//! dispatch layer forwards it at the offending source location.

use std::fmt;

/// A source location, as granular as the host gives us.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    /// Fullname of the module the annotation appears in.
    pub module: String,
    /// 1-based line, 0 when unknown.
    pub line: u32,
}

impl Location {
    pub fn new(module: impl Into<String>, line: u32) -> Self {
        Self {
            module: module.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.line)
    }
}

/// A user-facing static-checking error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub location: Location,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

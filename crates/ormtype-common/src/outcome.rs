//! Resolution outcomes.
//!
//! Suspension is modeled explicitly: a handler either produces a final type,
//! asks the host for another analysis pass, or fails with a diagnostic.
//! Desynchronization from the registry is a separate fault (`RestartRequired`)
//! so it can never be mistaken for an ordinary empty resolution.

use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::typeref::TypeRef;

/// The three-state result of resolving an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A final type; no further passes needed for this site.
    Resolved(TypeRef),
    /// Required information is not available yet; ask the host to run
    /// another pass and re-invoke the hook.
    Defer,
    /// A genuine static-checking error at the annotation site.
    Failed(Diagnostic),
}

/// Long-lived process state has desynchronized from the model registry.
///
/// Raised when metadata an earlier pass should have produced is missing.
/// Guessing here would yield a plausible-looking wrong type, so this is
/// escalated at the hook boundary into an instruction to restart the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("analysis state is out of sync with the model registry ({reason}); restart the daemon")]
pub struct RestartRequired {
    pub reason: String,
}

impl RestartRequired {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

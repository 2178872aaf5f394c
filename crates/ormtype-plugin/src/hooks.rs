//! The two-phase hook protocol.
//!
//! Every extension point follows the same shape: a cheap `wants_*` membership
//! test (the choose phase), then a run method returning [`HookOutcome`].
//! `Delegate` means "not ours": the embedding host falls through to the next
//! handler in its chain (its own default, or another plugin's hook), which is
//! how hooks compose without knowing about each other.

/// Result of running a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome<T> {
    /// The hook produced the answer; stop the chain here.
    Handled(T),
    /// The hook declined; fall through to the next handler.
    Delegate,
}

impl<T> HookOutcome<T> {
    pub fn handled(self) -> Option<T> {
        match self {
            Self::Handled(value) => Some(value),
            Self::Delegate => None,
        }
    }

    /// Chain to a fallback handler (the "super hook") when this hook
    /// delegated.
    pub fn or_else(self, fallback: impl FnOnce() -> HookOutcome<T>) -> HookOutcome<T> {
        match self {
            Self::Handled(value) => Self::Handled(value),
            Self::Delegate => fallback(),
        }
    }

    /// Final link in a chain: take the fallback's plain answer.
    pub fn unwrap_or_else(self, fallback: impl FnOnce() -> T) -> T {
        match self {
            Self::Handled(value) => value,
            Self::Delegate => fallback(),
        }
    }
}

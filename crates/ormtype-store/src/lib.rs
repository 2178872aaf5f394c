//! Concrete-children store and queryset resolver.
//!
//! The authoritative mapping from abstract-class identity to known concrete
//! descendants, kept in an arena keyed by fullname (never attached to host
//! AST nodes), plus the resolution of a model's default queryset type.

pub mod children;
pub use children::{AbstractRecord, ChildLookup, ChildrenStore, Partiality, RecordState};

pub mod querysets;
pub use querysets::{QuerysetBinding, QuerysetResolver, StoreError};

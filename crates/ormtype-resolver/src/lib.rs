//! Annotation resolution.
//!
//! The three special generic annotations share one argument-analysis
//! pipeline and differ only in what they substitute for each member:
//! - `Concrete[X]`: the union of X's concrete descendants
//! - `ConcreteQuerySet[X]`: the union of those descendants' default querysets
//! - `DefaultQuerySet[X]`: X's own default queryset, never expanded
//!
//! Type-variable arguments cannot be resolved at annotation-analysis time;
//! the enclosing function is registered for a return-type follow-up hook and
//! the annotation is left in place until a call site binds the variable.

pub mod arguments;
pub use arguments::{ArgumentKind, ParsedArgument};

pub mod resolve;
pub use resolve::{AnnotationResolver, ResolveContext};

pub mod callsite;
pub use callsite::{CallInfo, FormalArg};

pub mod typevars;
pub use typevars::{TypeVarDef, TypeVarOutcome, TypeVarRequest};

pub mod guard;
pub use guard::{screen_type_guard, SignatureInfo};

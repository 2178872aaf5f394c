//! Type-guard screening.
//!
//! A type guard whose narrowed type is one of the special annotations over a
//! type variable cannot work: narrowing happens at the call site, where the
//! variable is already erased, so the guard would silently narrow to the
//! unresolved annotation. Such signatures are rejected when defined.

use ormtype_common::diagnostics::{Diagnostic, Location};
use ormtype_common::fullnames::KnownAnnotation;
use ormtype_common::typeref::TypeRef;

/// The slice of a function signature the screen needs.
#[derive(Debug)]
pub struct SignatureInfo {
    pub fullname: String,
    /// The narrowed type when the function is a type guard.
    pub type_guard: Option<TypeRef>,
    pub location: Location,
}

fn contains_type_var(typ: &TypeRef) -> bool {
    match typ {
        TypeRef::TypeVar { .. } => true,
        TypeRef::ClassObject(inner) => contains_type_var(inner),
        TypeRef::Instance { args, .. } => args.iter().any(contains_type_var),
        TypeRef::Union(items) => items.iter().any(contains_type_var),
        _ => false,
    }
}

/// Reject a type guard narrowing to an annotation over a type variable.
pub fn screen_type_guard(sig: &SignatureInfo) -> Option<Diagnostic> {
    let guard = sig.type_guard.as_ref()?;
    let inner = match guard {
        TypeRef::ClassObject(inner) => inner,
        other => other,
    };
    let TypeRef::Instance { fullname, args } = inner else {
        return None;
    };
    let annotation = KnownAnnotation::from_fullname(fullname)?;
    if args.iter().any(contains_type_var) {
        return Some(Diagnostic::new(
            format!(
                "a type guard cannot narrow to {} parameterized by a type variable",
                annotation.fullname()
            ),
            sig.location.clone(),
        ));
    }
    None
}

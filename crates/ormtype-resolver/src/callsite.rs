//! Call-site return-type rewriting.
//!
//! A function annotated `Concrete[T]` (or one of the queryset variants over
//! a type variable) cannot be resolved where it is defined. Once a call
//! supplies a concrete argument for `T`, the declared return type is
//! re-resolved here with the variable bound to the call-site type.

use ormtype_common::diagnostics::{Diagnostic, Location};
use ormtype_common::fullnames::KnownAnnotation;
use ormtype_common::host::HostApi;
use ormtype_common::outcome::{Outcome, RestartRequired};
use ormtype_common::typeref::TypeRef;
use ormtype_registry::ModelRegistry;
use ormtype_store::{ChildrenStore, QuerysetResolver};

use crate::resolve::{AnnotationResolver, ResolveContext};

/// One formal parameter of the callee, with its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormalArg {
    pub name: String,
    pub typ: TypeRef,
}

/// What the host tells us about one call expression.
#[derive(Debug)]
pub struct CallInfo {
    pub callee_fullname: String,
    /// The callee's declared return type, pre-substitution.
    pub declared_return: TypeRef,
    pub formal_args: Vec<FormalArg>,
    /// Argument types at the call, keyed by formal parameter name.
    pub call_args: Vec<(String, TypeRef)>,
    pub location: Location,
}

fn strip_class_object(typ: &TypeRef) -> &TypeRef {
    match typ {
        TypeRef::ClassObject(inner) => inner,
        other => other,
    }
}

/// Find the call-site type bound to `var_name` by matching it against the
/// callee's formals. A `type[T]` formal binds from a `type[X]` argument.
fn bind_type_var(info: &CallInfo, var_name: &str) -> Option<TypeRef> {
    for formal in &info.formal_args {
        let matches = matches!(
            strip_class_object(&formal.typ),
            TypeRef::TypeVar { name } if name == var_name
        );
        if !matches {
            continue;
        }
        if let Some((_, arg)) = info.call_args.iter().find(|(name, _)| *name == formal.name) {
            return Some(strip_class_object(arg).clone());
        }
    }
    None
}

/// Re-resolve the return type of a call to a registered function.
///
/// `Ok(None)` means the call needs no rewriting and the host should keep
/// the declared return type as-is.
pub fn rewrite_return_type(
    resolver: &mut AnnotationResolver,
    info: &CallInfo,
    children: &mut ChildrenStore,
    querysets: &mut QuerysetResolver,
    registry: &dyn ModelRegistry,
    host: &dyn HostApi,
) -> Result<Option<Outcome>, RestartRequired> {
    if !resolver.is_registered(&info.callee_fullname) {
        return Ok(None);
    }

    let TypeRef::Instance { fullname, args } = &info.declared_return else {
        return Ok(None);
    };
    let Some(annotation) = KnownAnnotation::from_fullname(fullname) else {
        return Ok(None);
    };
    let [payload] = args.as_slice() else {
        return Ok(None);
    };

    let bound = match payload {
        TypeRef::TypeVar { name } => match bind_type_var(info, name) {
            Some(bound) => bound,
            None => {
                return Ok(Some(Outcome::Failed(Diagnostic::new(
                    "failed to find an argument that matched the type variable",
                    info.location.clone(),
                ))));
            }
        },
        other => other.clone(),
    };

    let ctx = ResolveContext {
        annotation,
        argument: &bound,
        unanalyzed: &info.declared_return,
        receiver: None,
        enclosing_target: None,
        location: info.location.clone(),
    };
    resolver
        .resolve(&ctx, children, querysets, registry, host)
        .map(Some)
}

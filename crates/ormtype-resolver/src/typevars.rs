//! Type-variable synthesis.
//!
//! `type_var("T", Parent)`-style calls at module scope create a type
//! variable whose allowed values are the concrete descendants of the named
//! abstract class. The host hands over the assignment shape; this module
//! validates it and produces the variable definition once every descendant
//! has been analyzed.

use ormtype_common::diagnostics::{Diagnostic, Location};
use ormtype_common::host::HostApi;
use ormtype_common::typeref::TypeRef;
use ormtype_registry::ModelRegistry;
use ormtype_store::{ChildLookup, ChildrenStore, Partiality};

/// A synthesized type variable, ready for the host to intern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeVarDef {
    pub name: String,
    /// `<module>.<name>`, the identity the host stores it under.
    pub fullname: String,
    /// Allowed values, one per concrete descendant, in discovery order.
    pub values: Vec<TypeRef>,
}

/// A `X = type_var("X", Parent)` assignment as seen by the host.
#[derive(Debug)]
pub struct TypeVarRequest<'a> {
    /// Name on the left-hand side of the assignment.
    pub assigned_name: &'a str,
    /// The string literal passed as the first argument.
    pub declared_name: &'a str,
    /// Fullname of the abstract class passed as the second argument.
    pub parent: &'a str,
    /// Module the assignment appears in.
    pub module: &'a str,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeVarOutcome {
    Created(TypeVarDef),
    /// The parent's descendants are not all analyzed yet this pass.
    Defer,
    Failed(Diagnostic),
}

/// Validate a type-variable assignment and realize its values.
pub fn create_concrete_type_var(
    request: &TypeVarRequest<'_>,
    children: &mut ChildrenStore,
    registry: &dyn ModelRegistry,
    host: &dyn HostApi,
) -> TypeVarOutcome {
    if request.declared_name != request.assigned_name {
        return TypeVarOutcome::Failed(Diagnostic::new(
            format!(
                "type variable name {:?} must match the name it is assigned to ({:?})",
                request.declared_name, request.assigned_name
            ),
            request.location.clone(),
        ));
    }

    let is_abstract_model = match host.lookup_class(request.parent) {
        Some(info) => info.is_model() && info.is_abstract,
        None => registry
            .model_class(request.parent)
            .is_some_and(|model| model.is_abstract),
    };
    if !is_abstract_model {
        return TypeVarOutcome::Failed(Diagnostic::new(
            format!("{} is not an abstract model class", request.parent),
            request.location.clone(),
        ));
    }

    match children.children_of(request.parent, host, Partiality::RequireComplete) {
        ChildLookup::Resolved(values) if !values.is_empty() => {
            tracing::debug!(
                parent = request.parent,
                name = request.assigned_name,
                count = values.len(),
                "created concrete type variable"
            );
            TypeVarOutcome::Created(TypeVarDef {
                name: request.assigned_name.to_string(),
                fullname: format!("{}.{}", request.module, request.assigned_name),
                values,
            })
        }
        _ if host.final_iteration() => TypeVarOutcome::Failed(Diagnostic::new(
            format!("no concrete children found for {}", request.parent),
            request.location.clone(),
        )),
        _ => TypeVarOutcome::Defer,
    }
}

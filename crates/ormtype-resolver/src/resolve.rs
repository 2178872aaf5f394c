//! The annotation resolver.
//!
//! Takes a parsed annotation argument and substitutes the final type:
//! concrete descendants, their default querysets, or the member's own
//! default queryset depending on the annotation. Anything that cannot be
//! answered on the current pass comes back as `Outcome::Defer`.

use ormtype_common::diagnostics::{Diagnostic, Location};
use ormtype_common::fullnames::KnownAnnotation;
use ormtype_common::host::HostApi;
use ormtype_common::outcome::{Outcome, RestartRequired};
use ormtype_common::typeref::TypeRef;
use ormtype_registry::ModelRegistry;
use ormtype_store::{ChildLookup, ChildrenStore, Partiality, QuerysetResolver, StoreError};
use rustc_hash::FxHashSet;

use crate::arguments::{parse_argument, ArgumentKind, ParsedArgument};

/// Everything a hook knows about one annotation site.
#[derive(Debug)]
pub struct ResolveContext<'a> {
    pub annotation: KnownAnnotation,
    /// The analyzed type argument of the annotation.
    pub argument: &'a TypeRef,
    /// The annotation as written, returned untouched when resolution must
    /// wait for a call site to bind a type variable.
    pub unanalyzed: &'a TypeRef,
    /// Instance type of `self` when the annotation sits inside a method.
    pub receiver: Option<&'a TypeRef>,
    /// Fullname of the enclosing function, when there is one.
    pub enclosing_target: Option<&'a str>,
    pub location: Location,
}

enum Expansion {
    Members(Vec<TypeRef>),
    Defer,
    Failed(Diagnostic),
}

enum QuerysetExpansion {
    Realized(Vec<TypeRef>),
    Failed(Diagnostic),
}

/// Resolves the three special annotations and remembers which functions
/// need a return-type follow-up at their call sites.
#[derive(Debug, Default)]
pub struct AnnotationResolver {
    registered_for_function_hook: FxHashSet<String>,
}

impl AnnotationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether calls to this function need their return type re-resolved.
    pub fn is_registered(&self, fullname: &str) -> bool {
        self.registered_for_function_hook.contains(fullname)
    }

    /// Resolve one annotation site into its final type.
    ///
    /// `Err` here means the process has desynchronized from the registry and
    /// must escalate to a restart; ordinary static errors come back as
    /// `Outcome::Failed`.
    pub fn resolve(
        &mut self,
        ctx: &ResolveContext<'_>,
        children: &mut ChildrenStore,
        querysets: &mut QuerysetResolver,
        registry: &dyn ModelRegistry,
        host: &dyn HostApi,
    ) -> Result<Outcome, RestartRequired> {
        let parsed = match parse_argument(ctx.argument, ctx.receiver, &ctx.location) {
            Ok(ArgumentKind::Classes(parsed)) => parsed,
            Ok(ArgumentKind::TypeVar { name }) => {
                // The variable only gets a value at a call site. Leave the
                // annotation as written and arrange to revisit each call.
                if let Some(target) = ctx.enclosing_target {
                    tracing::debug!(target, type_var = %name, "registered for call-site resolution");
                    self.registered_for_function_hook.insert(target.to_string());
                }
                return Ok(Outcome::Resolved(ctx.unanalyzed.clone()));
            }
            Err(diagnostic) => return Ok(Outcome::Failed(diagnostic)),
        };

        let result = match ctx.annotation {
            KnownAnnotation::Concrete => {
                match self.expand(&parsed, ctx, children, registry, host) {
                    Expansion::Members(members) => TypeRef::union(members),
                    Expansion::Defer => return Ok(Outcome::Defer),
                    Expansion::Failed(diagnostic) => return Ok(Outcome::Failed(diagnostic)),
                }
            }
            KnownAnnotation::ConcreteQuerySet => {
                let members = match self.expand(&parsed, ctx, children, registry, host) {
                    Expansion::Members(members) => members,
                    Expansion::Defer => return Ok(Outcome::Defer),
                    Expansion::Failed(diagnostic) => return Ok(Outcome::Failed(diagnostic)),
                };
                match self.querysets_of(&members, &ctx.location, querysets, registry, host)? {
                    QuerysetExpansion::Realized(realized) => TypeRef::union(realized),
                    QuerysetExpansion::Failed(diagnostic) => {
                        return Ok(Outcome::Failed(diagnostic));
                    }
                }
            }
            KnownAnnotation::DefaultQuerySet => {
                // Never expanded: an abstract member keeps its own generic
                // queryset rather than the union of its descendants'.
                let members: Vec<TypeRef> = parsed
                    .members
                    .iter()
                    .map(|name| TypeRef::instance(name.clone()))
                    .collect();
                match self.querysets_of(&members, &ctx.location, querysets, registry, host)? {
                    QuerysetExpansion::Realized(realized) => TypeRef::union(realized),
                    QuerysetExpansion::Failed(diagnostic) => {
                        return Ok(Outcome::Failed(diagnostic));
                    }
                }
            }
        };

        let result = if parsed.class_object {
            TypeRef::class_object(result)
        } else {
            result
        };
        Ok(Outcome::Resolved(result))
    }

    /// Replace abstract members with their concrete descendants; concrete
    /// members pass through as themselves.
    fn expand(
        &self,
        parsed: &ParsedArgument,
        ctx: &ResolveContext<'_>,
        children: &mut ChildrenStore,
        registry: &dyn ModelRegistry,
        host: &dyn HostApi,
    ) -> Expansion {
        let mut expanded = Vec::with_capacity(parsed.members.len());
        for member in &parsed.members {
            let is_abstract = match host.lookup_class(member) {
                Some(info) => info.is_abstract,
                None => match registry.model_class(member) {
                    Some(model) => model.is_abstract,
                    None if host.final_iteration() => {
                        return Expansion::Failed(Diagnostic::new(
                            format!("failed to resolve {member}"),
                            ctx.location.clone(),
                        ));
                    }
                    None => return Expansion::Defer,
                },
            };

            if is_abstract {
                match children.children_of(member, host, Partiality::RequireComplete) {
                    ChildLookup::Resolved(realized) if !realized.is_empty() => {
                        expanded.extend(realized);
                    }
                    // Empty or pending: either not every descendant has been
                    // seen this pass, or there truly are none.
                    _ if host.final_iteration() => {
                        return Expansion::Failed(Diagnostic::new(
                            format!("no concrete children found for {member}"),
                            ctx.location.clone(),
                        ));
                    }
                    _ => return Expansion::Defer,
                }
            } else {
                match host.named_instance(member) {
                    Some(instance) => expanded.push(instance),
                    None if host.final_iteration() => {
                        return Expansion::Failed(Diagnostic::new(
                            format!("failed to resolve {member}"),
                            ctx.location.clone(),
                        ));
                    }
                    None => return Expansion::Defer,
                }
            }
        }
        Expansion::Members(expanded)
    }

    fn querysets_of(
        &self,
        members: &[TypeRef],
        location: &Location,
        querysets: &mut QuerysetResolver,
        registry: &dyn ModelRegistry,
        host: &dyn HostApi,
    ) -> Result<QuerysetExpansion, RestartRequired> {
        let target = TypeRef::union(members.to_vec());
        match querysets.querysets_for(&target, registry, host) {
            Ok(realized) => Ok(QuerysetExpansion::Realized(realized)),
            Err(StoreError::Restart(restart)) => Err(restart),
            Err(StoreError::UnionMemberNotClass) => Ok(QuerysetExpansion::Failed(
                Diagnostic::new("union members must be plain model classes", location.clone()),
            )),
        }
    }
}

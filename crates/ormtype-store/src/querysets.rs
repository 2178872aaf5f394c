//! Queryset resolution.
//!
//! Given a model, determine the queryset type its default manager yields:
//! either the generic default queryset parameterized by the model, or a
//! named custom queryset class. Manager-to-queryset associations are cached
//! per manager base class, since many models share one generation scheme.

use ormtype_common::fullnames::QUERYSET_CLASS_FULLNAME;
use ormtype_common::host::HostLookup;
use ormtype_common::outcome::RestartRequired;
use ormtype_common::typeref::TypeRef;
use ormtype_registry::ModelRegistry;
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Restart(#[from] RestartRequired),
    /// A union argument contained something other than a plain model class.
    #[error("union members must be plain model classes")]
    UnionMemberNotClass,
}

/// The queryset type associated with a model's default manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerysetBinding {
    /// The generic default queryset, parameterized by the model itself.
    Generic { model: String },
    /// A named custom queryset class used by the default manager.
    Custom { model: String, queryset: String },
}

/// Derives and caches queryset bindings from live manager metadata.
#[derive(Debug, Default)]
pub struct QuerysetResolver {
    /// manager base fullname -> { manager fullname -> queryset fullname }.
    generated_managers: FxHashMap<String, FxHashMap<String, String>>,
}

impl QuerysetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The binding for one model's default manager.
    ///
    /// A model the registry cannot produce means our cached view has
    /// desynchronized from the live registry, which is a restart fault,
    /// not a resolvable condition.
    pub fn binding_for(
        &mut self,
        model_fullname: &str,
        registry: &dyn ModelRegistry,
    ) -> Result<QuerysetBinding, StoreError> {
        let model = registry.model_class(model_fullname).ok_or_else(|| {
            RestartRequired::new(format!("could not find model class for {model_fullname}"))
        })?;

        let Some(manager) = &model.default_manager else {
            // Abstract models have no materialized manager; their own
            // generic queryset is still a meaningful answer.
            return Ok(QuerysetBinding::Generic {
                model: model_fullname.to_string(),
            });
        };

        if let Some(queryset) = &manager.from_queryset {
            self.generated_managers
                .entry(manager.base_fullname.clone())
                .or_default()
                .insert(manager.fullname.clone(), queryset.clone());
            return Ok(QuerysetBinding::Custom {
                model: model_fullname.to_string(),
                queryset: queryset.clone(),
            });
        }

        // A manager generated earlier under the same base class.
        if let Some(queryset) = self
            .generated_managers
            .get(&manager.base_fullname)
            .and_then(|by_manager| by_manager.get(&manager.fullname))
        {
            return Ok(QuerysetBinding::Custom {
                model: model_fullname.to_string(),
                queryset: queryset.clone(),
            });
        }

        if let Some(queryset) = &manager.queryset_class {
            return Ok(QuerysetBinding::Custom {
                model: model_fullname.to_string(),
                queryset: queryset.clone(),
            });
        }

        Ok(QuerysetBinding::Generic {
            model: model_fullname.to_string(),
        })
    }

    /// Realize a binding into a checker type.
    ///
    /// Custom querysets are not generic over the model in this design; when
    /// one nevertheless declares type parameters, each is filled with the
    /// model instance, same as the generic default.
    pub fn realize(
        &self,
        binding: &QuerysetBinding,
        host: &dyn HostLookup,
    ) -> Result<TypeRef, StoreError> {
        let (model, queryset_fullname) = match binding {
            QuerysetBinding::Generic { model } => (model, QUERYSET_CLASS_FULLNAME),
            QuerysetBinding::Custom { model, queryset } => (model, queryset.as_str()),
        };
        let info = host.lookup_class(queryset_fullname).ok_or_else(|| {
            RestartRequired::new(format!("could not find queryset {queryset_fullname}"))
        })?;
        let args = vec![TypeRef::instance(model.clone()); info.type_var_count];
        Ok(TypeRef::instance_with_args(info.fullname, args))
    }

    /// The default queryset type for one model.
    pub fn queryset_for_model(
        &mut self,
        model_fullname: &str,
        registry: &dyn ModelRegistry,
        host: &dyn HostLookup,
    ) -> Result<TypeRef, StoreError> {
        let binding = self.binding_for(model_fullname, registry)?;
        self.realize(&binding, host)
    }

    /// Default querysets for a model instance or a union of model instances,
    /// one result per member in order.
    pub fn querysets_for(
        &mut self,
        target: &TypeRef,
        registry: &dyn ModelRegistry,
        host: &dyn HostLookup,
    ) -> Result<Vec<TypeRef>, StoreError> {
        let members: Vec<&TypeRef> = match target {
            TypeRef::Union(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut realized = Vec::with_capacity(members.len());
        for member in members {
            let fullname = member
                .instance_fullname()
                .ok_or(StoreError::UnionMemberNotClass)?;
            realized.push(self.queryset_for_model(fullname, registry, host)?);
        }
        Ok(realized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormtype_common::testing::FakeHost;
    use ormtype_common::ClassInfo;
    use ormtype_registry::{InMemoryRegistry, ManagerDesc, ModelClass};

    const MANAGER_BASE: &str = "ormlib.managers.Manager";

    fn model_with_manager(fullname: &str, manager: Option<ManagerDesc>) -> ModelClass {
        ModelClass {
            fullname: fullname.to_string(),
            module: String::new(),
            app_label: "shop".to_string(),
            is_abstract: manager.is_none(),
            bases: Vec::new(),
            related_models: Vec::new(),
            reverse_related_models: Vec::new(),
            default_manager: manager,
        }
    }

    fn plain_manager() -> ManagerDesc {
        ManagerDesc {
            fullname: "ormlib.managers.Manager".to_string(),
            base_fullname: MANAGER_BASE.to_string(),
            from_queryset: None,
            queryset_class: None,
        }
    }

    fn generated_manager(queryset: &str) -> ManagerDesc {
        ManagerDesc {
            fullname: "shop.models.ItemManager".to_string(),
            base_fullname: MANAGER_BASE.to_string(),
            from_queryset: Some(queryset.to_string()),
            queryset_class: None,
        }
    }

    fn host_with_querysets() -> FakeHost {
        let mut host = FakeHost::new();
        host.add_class(ClassInfo {
            fullname: QUERYSET_CLASS_FULLNAME.to_string(),
            module: "ormlib.querysets".to_string(),
            is_abstract: false,
            mro: Vec::new(),
            type_var_count: 1,
        });
        host.add_simple_class("shop.models.ItemQuerySet", false, &[]);
        host
    }

    #[test]
    fn test_plain_manager_gets_generic_queryset() {
        let mut registry = InMemoryRegistry::new();
        registry.set_installed_apps(vec!["shop".to_string()]);
        registry.insert_model(model_with_manager("shop.models.Item", Some(plain_manager())));

        let mut resolver = QuerysetResolver::new();
        let host = host_with_querysets();
        let realized = resolver
            .queryset_for_model("shop.models.Item", &registry, &host)
            .unwrap();
        assert_eq!(
            realized,
            TypeRef::instance_with_args(
                QUERYSET_CLASS_FULLNAME,
                vec![TypeRef::instance("shop.models.Item")]
            )
        );
    }

    #[test]
    fn test_generated_manager_gets_named_queryset_unparameterized() {
        let mut registry = InMemoryRegistry::new();
        registry.set_installed_apps(vec!["shop".to_string()]);
        registry.insert_model(model_with_manager(
            "shop.models.Item",
            Some(generated_manager("shop.models.ItemQuerySet")),
        ));

        let mut resolver = QuerysetResolver::new();
        let host = host_with_querysets();
        let realized = resolver
            .queryset_for_model("shop.models.Item", &registry, &host)
            .unwrap();
        assert_eq!(realized, TypeRef::instance("shop.models.ItemQuerySet"));

        // The association is cached under the manager's base class.
        let binding = resolver
            .binding_for("shop.models.Item", &registry)
            .unwrap();
        assert_eq!(
            binding,
            QuerysetBinding::Custom {
                model: "shop.models.Item".to_string(),
                queryset: "shop.models.ItemQuerySet".to_string(),
            }
        );
    }

    #[test]
    fn test_abstract_model_without_manager_binds_its_own_generic_queryset() {
        let mut registry = InMemoryRegistry::new();
        registry.set_installed_apps(vec!["shop".to_string()]);
        registry.insert_model(model_with_manager("shop.models.Parent", None));

        let mut resolver = QuerysetResolver::new();
        let binding = resolver
            .binding_for("shop.models.Parent", &registry)
            .unwrap();
        assert_eq!(
            binding,
            QuerysetBinding::Generic {
                model: "shop.models.Parent".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_model_is_a_restart_fault() {
        let registry = InMemoryRegistry::new();
        let mut resolver = QuerysetResolver::new();
        let err = resolver
            .binding_for("shop.models.Ghost", &registry)
            .unwrap_err();
        assert!(matches!(err, StoreError::Restart(_)));
    }

    #[test]
    fn test_unresolvable_queryset_class_is_a_restart_fault() {
        let mut registry = InMemoryRegistry::new();
        registry.set_installed_apps(vec!["shop".to_string()]);
        registry.insert_model(model_with_manager(
            "shop.models.Item",
            Some(generated_manager("shop.models.GhostQuerySet")),
        ));

        let mut resolver = QuerysetResolver::new();
        let host = host_with_querysets();
        let err = resolver
            .queryset_for_model("shop.models.Item", &registry, &host)
            .unwrap_err();
        assert!(matches!(err, StoreError::Restart(_)));
    }

    #[test]
    fn test_union_with_non_class_member_is_rejected() {
        let mut registry = InMemoryRegistry::new();
        registry.set_installed_apps(vec!["shop".to_string()]);
        registry.insert_model(model_with_manager("shop.models.Item", Some(plain_manager())));

        let mut resolver = QuerysetResolver::new();
        let host = host_with_querysets();
        let union = TypeRef::Union(vec![
            TypeRef::instance("shop.models.Item"),
            TypeRef::type_var("T"),
        ]);
        let err = resolver
            .querysets_for(&union, &registry, &host)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnionMemberNotClass));
    }
}

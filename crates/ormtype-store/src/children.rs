//! The concrete-children store.
//!
//! One record per abstract class, living for the whole process. Discovery is
//! incremental: the host visits classes in whatever order it likes, a hook
//! registers each concrete class on its abstract ancestors, and resolution
//! tolerates the resulting partial state by deferring until a pass supplies
//! complete information.

use indexmap::IndexSet;
use ormtype_common::fullnames::MODEL_CLASS_FULLNAME;
use ormtype_common::host::HostLookup;
use ormtype_common::typeref::TypeRef;
use ormtype_registry::ModelRegistry;
use rustc_hash::FxHashMap;

/// Lifecycle of an abstract class's record.
///
/// `Partial -> Stable` happens when every stored child resolves through the
/// host in one pass; only then may annotations take their final value
/// instead of deferring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// No concrete descendants known yet.
    Empty,
    /// Some concretes known, more may appear on later passes.
    Partial,
    /// Fixed point reached; repeated resolution returns the identical set.
    Stable,
}

/// Known concrete descendants of one abstract class.
#[derive(Debug)]
pub struct AbstractRecord {
    /// Insertion-ordered, deduplicated child fullnames.
    children: IndexSet<String>,
    state: RecordState,
    /// Realized instances, cached once every child resolved in one pass.
    resolved: Option<Vec<TypeRef>>,
}

impl AbstractRecord {
    fn new() -> Self {
        Self {
            children: IndexSet::new(),
            state: RecordState::Empty,
            resolved: None,
        }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }

    fn invalidate(&mut self) {
        self.resolved = None;
        self.state = if self.children.is_empty() {
            RecordState::Empty
        } else {
            RecordState::Partial
        };
    }
}

/// Whether a caller can use an incomplete descendant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partiality {
    /// Unresolvable children are dropped from the result.
    AcceptPartial,
    /// Any unresolvable child makes the whole lookup pending.
    RequireComplete,
}

/// Result of realizing a record into checker instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildLookup {
    /// All requested children realized. May be empty, which callers must
    /// distinguish between "no subclasses yet" and "final pass, report it".
    Resolved(Vec<TypeRef>),
    /// Completeness was required and some child has not been analyzed yet.
    Pending,
}

/// Arena of abstract-class records keyed by fullname.
#[derive(Debug, Default)]
pub struct ChildrenStore {
    records: FxHashMap<String, AbstractRecord>,
}

impl ChildrenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotently record `child` as a concrete descendant of `parent`.
    ///
    /// Every call re-validates the whole list against the registry, pruning
    /// descendants that no longer exist or have since become abstract, so a
    /// stale entry can never outlive a file edit or app removal.
    pub fn register(&mut self, parent: &str, child: &str, registry: &dyn ModelRegistry) {
        let record = self
            .records
            .entry(parent.to_string())
            .or_insert_with(AbstractRecord::new);

        let len_before = record.children.len();
        let inserted = record.children.insert(child.to_string());
        record
            .children
            .retain(|fullname| registry.is_installed(fullname, true));

        if inserted || record.children.len() != len_before + usize::from(inserted) {
            tracing::trace!(parent, child, "children set changed");
            record.invalidate();
        }
    }

    /// Register a newly-analyzed class on every abstract model ancestor.
    ///
    /// Fired once per class the host visits, whether or not that class uses
    /// any special annotation; this is how records fill in incrementally.
    pub fn fill_out_concrete_children(
        &mut self,
        fullname: &str,
        host: &dyn HostLookup,
        registry: &dyn ModelRegistry,
    ) {
        let Some(info) = host.lookup_class(fullname) else {
            return;
        };
        if !info.is_model() || info.is_abstract {
            return;
        }
        for base in &info.mro {
            if base == MODEL_CLASS_FULLNAME {
                break;
            }
            let base_is_abstract = match host.lookup_class(base) {
                Some(base_info) => base_info.is_abstract,
                // The ancestor's module may not be analyzed yet this pass;
                // the registry still knows its abstractness.
                None => registry
                    .model_class(base)
                    .is_some_and(|model| model.is_abstract),
            };
            if base_is_abstract {
                self.register(base, fullname, registry);
            }
        }
    }

    /// Realize the record's children into checker instances.
    pub fn children_of(
        &mut self,
        parent: &str,
        host: &dyn HostLookup,
        partiality: Partiality,
    ) -> ChildLookup {
        let record = self
            .records
            .entry(parent.to_string())
            .or_insert_with(AbstractRecord::new);

        if let Some(cached) = &record.resolved {
            return ChildLookup::Resolved(cached.clone());
        }

        let mut realized = Vec::with_capacity(record.children.len());
        let mut missing = false;
        for child in &record.children {
            match host.named_instance(child) {
                Some(instance) => realized.push(instance),
                None => missing = true,
            }
        }

        if missing {
            record.state = RecordState::Partial;
            return match partiality {
                Partiality::RequireComplete => ChildLookup::Pending,
                Partiality::AcceptPartial => ChildLookup::Resolved(realized),
            };
        }

        record.state = if realized.is_empty() {
            RecordState::Empty
        } else {
            RecordState::Stable
        };
        record.resolved = Some(realized.clone());
        ChildLookup::Resolved(realized)
    }

    pub fn state_of(&self, parent: &str) -> RecordState {
        self.records
            .get(parent)
            .map_or(RecordState::Empty, AbstractRecord::state)
    }

    pub fn record(&self, parent: &str) -> Option<&AbstractRecord> {
        self.records.get(parent)
    }

    /// Drop every descendant the registry no longer vouches for, across all
    /// records. Called after a registry refresh (application added/removed).
    pub fn prune(&mut self, registry: &dyn ModelRegistry) {
        for (parent, record) in &mut self.records {
            let len_before = record.children.len();
            record
                .children
                .retain(|fullname| registry.is_installed(fullname, true));
            if record.children.len() != len_before {
                tracing::debug!(
                    parent,
                    dropped = len_before - record.children.len(),
                    "pruned uninstalled descendants"
                );
                record.invalidate();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormtype_common::testing::FakeHost;
    use ormtype_registry::{InMemoryRegistry, ModelClass};

    fn model(fullname: &str, app: &str, is_abstract: bool) -> ModelClass {
        ModelClass {
            fullname: fullname.to_string(),
            module: String::new(),
            app_label: app.to_string(),
            is_abstract,
            bases: Vec::new(),
            related_models: Vec::new(),
            reverse_related_models: Vec::new(),
            default_manager: None,
        }
    }

    fn registry_with_children() -> InMemoryRegistry {
        let mut registry = InMemoryRegistry::new();
        registry.set_installed_apps(vec!["shop".to_string()]);
        registry.insert_model(model("shop.models.Parent", "shop", true));
        registry.insert_model(model("shop.models.Child1", "shop", false));
        registry.insert_model(model("shop.models.Child2", "shop", false));
        registry
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = registry_with_children();
        let mut store = ChildrenStore::new();
        store.register("shop.models.Parent", "shop.models.Child1", &registry);
        store.register("shop.models.Parent", "shop.models.Child1", &registry);
        store.register("shop.models.Parent", "shop.models.Child2", &registry);
        store.register("shop.models.Parent", "shop.models.Child1", &registry);

        let children: Vec<&str> = store
            .record("shop.models.Parent")
            .unwrap()
            .children()
            .collect();
        assert_eq!(children, ["shop.models.Child1", "shop.models.Child2"]);
    }

    #[test]
    fn test_register_prunes_descendants_the_registry_dropped() {
        let registry = registry_with_children();
        let mut store = ChildrenStore::new();
        store.register("shop.models.Parent", "shop.models.Child1", &registry);
        store.register("shop.models.Parent", "shop.models.Child2", &registry);

        // Simulate an edit removing Child1 from the project.
        let mut slim = InMemoryRegistry::new();
        slim.set_installed_apps(vec!["shop".to_string()]);
        slim.insert_model(model("shop.models.Parent", "shop", true));
        slim.insert_model(model("shop.models.Child2", "shop", false));

        store.register("shop.models.Parent", "shop.models.Child2", &slim);
        let children: Vec<&str> = store
            .record("shop.models.Parent")
            .unwrap()
            .children()
            .collect();
        assert_eq!(children, ["shop.models.Child2"]);
    }

    #[test]
    fn test_children_of_defers_until_host_resolves_everything() {
        let registry = registry_with_children();
        let mut store = ChildrenStore::new();
        store.register("shop.models.Parent", "shop.models.Child1", &registry);
        store.register("shop.models.Parent", "shop.models.Child2", &registry);

        let mut host = FakeHost::new();
        host.add_simple_class("shop.models.Child1", false, &["shop.models.Parent"]);
        // Child2's module not analyzed yet.

        assert_eq!(
            store.children_of("shop.models.Parent", &host, Partiality::RequireComplete),
            ChildLookup::Pending
        );
        assert_eq!(store.state_of("shop.models.Parent"), RecordState::Partial);

        // Partial results drop the unresolved child but do not cache.
        assert_eq!(
            store.children_of("shop.models.Parent", &host, Partiality::AcceptPartial),
            ChildLookup::Resolved(vec![TypeRef::instance("shop.models.Child1")])
        );

        host.add_simple_class("shop.models.Child2", false, &["shop.models.Parent"]);
        assert_eq!(
            store.children_of("shop.models.Parent", &host, Partiality::RequireComplete),
            ChildLookup::Resolved(vec![
                TypeRef::instance("shop.models.Child1"),
                TypeRef::instance("shop.models.Child2"),
            ])
        );
        assert_eq!(store.state_of("shop.models.Parent"), RecordState::Stable);
    }

    #[test]
    fn test_stable_records_return_identical_ordered_sets() {
        let registry = registry_with_children();
        let mut store = ChildrenStore::new();
        store.register("shop.models.Parent", "shop.models.Child2", &registry);
        store.register("shop.models.Parent", "shop.models.Child1", &registry);

        let mut host = FakeHost::new();
        host.add_simple_class("shop.models.Child1", false, &["shop.models.Parent"]);
        host.add_simple_class("shop.models.Child2", false, &["shop.models.Parent"]);

        let first = store.children_of("shop.models.Parent", &host, Partiality::RequireComplete);
        // Re-registering the same pairs must not disturb the stable set.
        store.register("shop.models.Parent", "shop.models.Child2", &registry);
        let second = store.children_of("shop.models.Parent", &host, Partiality::RequireComplete);
        assert_eq!(first, second);
        assert_eq!(store.state_of("shop.models.Parent"), RecordState::Stable);
    }

    #[test]
    fn test_fill_out_registers_on_every_abstract_ancestor_only() {
        let mut registry = registry_with_children();
        registry.insert_model(model("shop.models.Mid", "shop", false));

        let mut host = FakeHost::new();
        host.add_simple_class("shop.models.Parent", true, &[MODEL_CLASS_FULLNAME]);
        host.add_simple_class(
            "shop.models.Mid",
            false,
            &["shop.models.Parent", MODEL_CLASS_FULLNAME],
        );
        host.add_simple_class(
            "shop.models.Child1",
            false,
            &["shop.models.Mid", "shop.models.Parent", MODEL_CLASS_FULLNAME],
        );

        let mut store = ChildrenStore::new();
        store.fill_out_concrete_children("shop.models.Child1", &host, &registry);

        let parent_children: Vec<&str> = store
            .record("shop.models.Parent")
            .unwrap()
            .children()
            .collect();
        assert_eq!(parent_children, ["shop.models.Child1"]);
        // Mid is concrete, so nothing was registered under it.
        assert!(store.record("shop.models.Mid").is_none());
    }

    #[test]
    fn test_fill_out_ignores_abstract_and_non_model_classes() {
        let registry = registry_with_children();
        let mut host = FakeHost::new();
        host.add_simple_class("shop.models.Parent", true, &[MODEL_CLASS_FULLNAME]);
        host.add_simple_class("shop.helpers.Mixin", false, &[]);

        let mut store = ChildrenStore::new();
        store.fill_out_concrete_children("shop.models.Parent", &host, &registry);
        store.fill_out_concrete_children("shop.helpers.Mixin", &host, &registry);
        assert!(store.record("shop.models.Parent").is_none());
    }

    #[test]
    fn test_prune_invalidates_the_stable_cache() {
        let registry = registry_with_children();
        let mut store = ChildrenStore::new();
        store.register("shop.models.Parent", "shop.models.Child1", &registry);
        store.register("shop.models.Parent", "shop.models.Child2", &registry);

        let mut host = FakeHost::new();
        host.add_simple_class("shop.models.Child1", false, &["shop.models.Parent"]);
        host.add_simple_class("shop.models.Child2", false, &["shop.models.Parent"]);
        store.children_of("shop.models.Parent", &host, Partiality::RequireComplete);
        assert_eq!(store.state_of("shop.models.Parent"), RecordState::Stable);

        // Child2's model disappears from the project.
        let mut slim = InMemoryRegistry::new();
        slim.set_installed_apps(vec!["shop".to_string()]);
        slim.insert_model(model("shop.models.Parent", "shop", true));
        slim.insert_model(model("shop.models.Child1", "shop", false));
        store.prune(&slim);

        assert_eq!(
            store.children_of("shop.models.Parent", &host, Partiality::RequireComplete),
            ChildLookup::Resolved(vec![TypeRef::instance("shop.models.Child1")]),
            "a pruned record must not serve its pre-prune cached set"
        );
    }

    #[test]
    fn test_register_revalidates_only_the_touched_record() {
        let mut registry = registry_with_children();
        registry.set_installed_apps(vec!["shop".to_string(), "blog".to_string()]);
        registry.insert_model(model("blog.models.Base", "blog", true));
        registry.insert_model(model("blog.models.Post", "blog", false));

        let mut store = ChildrenStore::new();
        store.register("shop.models.Parent", "shop.models.Child1", &registry);
        store.register("shop.models.Parent", "shop.models.Child2", &registry);
        store.register("blog.models.Base", "blog.models.Post", &registry);

        // Child1 vanishes; a later registration on Parent drops it there,
        // keeps Child2, and leaves the blog record alone.
        let mut slim = InMemoryRegistry::new();
        slim.set_installed_apps(vec!["shop".to_string(), "blog".to_string()]);
        slim.insert_model(model("shop.models.Parent", "shop", true));
        slim.insert_model(model("shop.models.Child2", "shop", false));
        slim.insert_model(model("blog.models.Base", "blog", true));
        slim.insert_model(model("blog.models.Post", "blog", false));
        store.register("shop.models.Parent", "shop.models.Child2", &slim);

        let parent_children: Vec<&str> = store
            .record("shop.models.Parent")
            .unwrap()
            .children()
            .collect();
        assert_eq!(parent_children, ["shop.models.Child2"]);
        let blog_children: Vec<&str> = store
            .record("blog.models.Base")
            .unwrap()
            .children()
            .collect();
        assert_eq!(blog_children, ["blog.models.Post"]);
    }

    #[test]
    fn test_prune_touches_only_affected_records() {
        let mut registry = registry_with_children();
        registry.set_installed_apps(vec!["shop".to_string(), "blog".to_string()]);
        registry.insert_model(model("blog.models.Base", "blog", true));
        registry.insert_model(model("blog.models.Post", "blog", false));

        let mut store = ChildrenStore::new();
        store.register("shop.models.Parent", "shop.models.Child1", &registry);
        store.register("blog.models.Base", "blog.models.Post", &registry);

        registry.remove_app("blog");
        store.prune(&registry);

        assert_eq!(
            store.record("blog.models.Base").unwrap().children().count(),
            0
        );
        let shop_children: Vec<&str> = store
            .record("shop.models.Parent")
            .unwrap()
            .children()
            .collect();
        assert_eq!(shop_children, ["shop.models.Child1"]);
    }
}

//! Per-module dependency discovery.
//!
//! A module depends on another when a model in it inherits from, or relates
//! to, a model defined there, or when its source imports it. Inheritance
//! edges are recorded in both directions: editing an abstract base must
//! re-analyze its subclasses' modules, and a new subclass must re-analyze
//! modules that resolve `Concrete` annotations over its base.

use indexmap::{IndexMap, IndexSet};
use ormtype_common::fullnames::{module_of, MODEL_CLASS_FULLNAME};
use ormtype_registry::ModelRegistry;

/// Computes the module dependency map from live registry state.
pub struct DepFinder<'a> {
    registry: &'a dyn ModelRegistry,
}

impl<'a> DepFinder<'a> {
    pub fn new(registry: &'a dyn ModelRegistry) -> Self {
        Self { registry }
    }

    /// module fullname -> set of module fullnames it depends on.
    ///
    /// Every known model module gets an entry, even when its set is empty,
    /// so the report tracks it.
    pub fn deps_for_all(&self) -> IndexMap<String, IndexSet<String>> {
        let mut deps: IndexMap<String, IndexSet<String>> = IndexMap::new();
        let mut edges: Vec<(String, String)> = Vec::new();

        for (module, classes) in self.registry.model_modules() {
            deps.entry(module.clone()).or_default();

            for fullname in classes.values() {
                let Some(model) = self.registry.model_class(fullname) else {
                    continue;
                };
                for base in &model.bases {
                    if base == MODEL_CLASS_FULLNAME {
                        continue;
                    }
                    let base_module = module_of(base);
                    if base_module != module {
                        edges.push((module.clone(), base_module.to_string()));
                        edges.push((base_module.to_string(), module.clone()));
                    }
                }
                for related in model
                    .related_models
                    .iter()
                    .chain(&model.reverse_related_models)
                {
                    let related_module = module_of(related);
                    if related_module != module {
                        edges.push((module.clone(), related_module.to_string()));
                    }
                }
            }

            if let Some(source) = self.registry.module_source(module) {
                for imported in self.scan_imports(source) {
                    if imported != *module {
                        edges.push((module.clone(), imported));
                    }
                }
            }
        }

        for (from, to) in edges {
            deps.entry(from).or_default().insert(to);
        }
        deps
    }

    /// Modules imported by `source` that the registry knows as model modules.
    ///
    /// A line-oriented scan, not a real parser: `import a.b` and
    /// `from a.b import C` shapes, with aliases and trailing comments
    /// tolerated. Anything the registry does not track is ignored.
    fn scan_imports(&self, source: &str) -> Vec<String> {
        let known = self.registry.model_modules();
        let mut found = Vec::new();
        for line in source.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("import ") {
                for part in rest.split(',') {
                    if let Some(name) = first_name(part) {
                        if known.contains_key(name) {
                            found.push(name.to_string());
                        }
                    }
                }
            } else if let Some(rest) = line.strip_prefix("from ") {
                let Some((module, names)) = rest.split_once(" import ") else {
                    continue;
                };
                let module = module.trim();
                if known.contains_key(module) {
                    found.push(module.to_string());
                }
                // `from pkg import models` can also name a module.
                for part in names.split(',') {
                    if let Some(name) = first_name(part) {
                        let dotted = format!("{module}.{name}");
                        if known.contains_key(dotted.as_str()) {
                            found.push(dotted);
                        }
                    }
                }
            }
        }
        found
    }
}

/// The bare dotted name in an import clause, before any `as` alias or
/// trailing comment.
fn first_name(part: &str) -> Option<&str> {
    part.trim().split_whitespace().next().filter(|name| {
        !name.is_empty()
            && name
                .chars()
                .all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '.')
    })
}

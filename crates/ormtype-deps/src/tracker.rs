//! The dependency tracker.
//!
//! Owns the computed dependency map and the on-disk report, answers the
//! host's per-file dependency queries, and runs the registry-drift refresh
//! cycle when an import references a model module the host cannot resolve.

use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use ormtype_common::hashing::{hash_sorted, stable_hash_hex};
use ormtype_registry::{InstalledAppsSnapshot, ModelRegistry, RegistryError};
use ormtype_store::ChildrenStore;
use thiserror::Error;

use crate::finder::DepFinder;
use crate::report::{ReportError, ReportStore};

#[derive(Debug, Error)]
pub enum DepsError {
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A dependency edge in the host checker's (priority, module, line) shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dep {
    pub priority: i32,
    pub module: String,
    /// -1 when the edge is not tied to a source line.
    pub line: i32,
}

impl Dep {
    /// Priority of edges synthesized from the dependency map.
    pub const COMPUTED_PRIORITY: i32 = 10;

    pub fn computed(module: impl Into<String>) -> Self {
        Self {
            priority: Self::COMPUTED_PRIORITY,
            module: module.into(),
            line: -1,
        }
    }
}

/// What one recompute did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecomputeOutcome {
    /// Modules whose summary changed.
    pub changed: usize,
    /// Files actually rewritten on disk.
    pub written: usize,
}

/// Computes, persists, and serves module dependencies.
#[derive(Debug)]
pub struct DepTracker {
    store: ReportStore,
    deps: IndexMap<String, IndexSet<String>>,
    settings_module: String,
}

impl DepTracker {
    pub fn open(
        report_root: &Path,
        prefix: &str,
        settings_module: &str,
    ) -> Result<Self, ReportError> {
        Ok(Self {
            store: ReportStore::open(report_root, prefix)?,
            deps: IndexMap::new(),
            settings_module: settings_module.to_string(),
        })
    }

    pub fn report(&self) -> &ReportStore {
        &self.store
    }

    /// Whether the tracker knows `module` as a model module (or the settings
    /// module) in its current dependency map.
    pub fn is_known_module(&self, module: &str) -> bool {
        self.deps.contains_key(module)
    }

    /// Recompute the dependency map from registry state and persist the
    /// report. Summaries fold in the installed-apps fingerprint, so an app
    /// change dirties every tracked module at once.
    pub fn recompute(&mut self, registry: &dyn ModelRegistry) -> Result<RecomputeOutcome, ReportError> {
        let mut deps = DepFinder::new(registry).deps_for_all();
        // The settings module is always tracked, even with no models of its
        // own; app-list changes must reach files that only import settings.
        deps.entry(self.settings_module.clone()).or_default();

        let apps_fingerprint = registry.apps_snapshot().fingerprint();
        self.store.retain_modules(|module| deps.contains_key(module));

        let mut changed = 0;
        for (module, module_deps) in &deps {
            let summary = format!(
                "installed_apps:{apps_fingerprint}.{}",
                hash_sorted(module_deps.iter())
            );
            if self.store.set_summary(module, &summary) {
                changed += 1;
            }
        }

        let written = self.store.write()?;
        self.deps = deps;
        tracing::debug!(changed, written, "dependency recompute finished");
        Ok(RecomputeOutcome { changed, written })
    }

    /// The host's per-file dependency list: its own declared deps, the
    /// computed module deps, and the module's report marker so a summary
    /// change forces re-analysis.
    pub fn for_file(&self, module: &str, super_deps: &[Dep]) -> Vec<Dep> {
        let mut merged: Vec<Dep> = super_deps.to_vec();
        if let Some(module_deps) = self.deps.get(module) {
            for dep in module_deps {
                push_unique(&mut merged, Dep::computed(dep.clone()));
            }
            push_unique(&mut merged, Dep::computed(self.store.marker_module(module)));
        }
        merged
    }

    /// Drift check: when a dependency names a module the registry tracks but
    /// the host cannot resolve, an application was added or removed
    /// mid-session. Refresh the registry, drop uninstalled classes from the
    /// children store, and recompute. Returns whether a refresh ran.
    pub fn refresh_if_unresolvable(
        &mut self,
        unresolvable: &[String],
        registry: &mut dyn ModelRegistry,
        children: &mut ChildrenStore,
    ) -> Result<bool, DepsError> {
        let drifted = unresolvable
            .iter()
            .any(|module| self.is_known_module(module));
        if !drifted {
            return Ok(false);
        }
        tracing::info!("registry drift detected; refreshing");
        registry.refresh()?;
        children.prune(registry);
        self.recompute(registry)?;
        Ok(true)
    }

    /// Cross-process version fingerprint: installed apps plus report
    /// content. Any change tells the daemon layer to restart rather than
    /// patch incrementally.
    pub fn version_fingerprint(
        &self,
        snapshot: &InstalledAppsSnapshot,
    ) -> Result<String, ReportError> {
        let combined = format!(
            "{}\n{}",
            snapshot.fingerprint(),
            self.store.manifest_fingerprint()?
        );
        Ok(stable_hash_hex(combined.as_bytes()))
    }
}

fn push_unique(deps: &mut Vec<Dep>, dep: Dep) {
    if !deps.contains(&dep) {
        deps.push(dep);
    }
}

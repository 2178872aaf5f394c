//! The registry trait and the in-memory implementation.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::model::ModelClass;
use crate::snapshot::InstalledAppsSnapshot;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no project manifest for settings module `{settings_module}` at {path}")]
    MissingManifest {
        settings_module: String,
        path: String,
    },
    #[error("malformed project manifest at {path}: {source}")]
    MalformedManifest {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not read project manifest at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read access to the live model registry.
///
/// `model_modules` is insertion-ordered so that resolution output is stable
/// across identical registry states.
pub trait ModelRegistry {
    /// The registered class backing a fullname, if any.
    fn model_class(&self, fullname: &str) -> Option<&ModelClass>;

    /// module fullname -> { class name -> class fullname } for every model.
    fn model_modules(&self) -> &IndexMap<String, IndexMap<String, String>>;

    /// Ordered labels of the currently active applications.
    fn installed_apps(&self) -> &[String];

    /// Source text of a model module, when the registry can supply it.
    /// Used only for the import scan of the dependency tracker.
    fn module_source(&self, module: &str) -> Option<&str>;

    /// Re-read registry state from its backing source. In-memory registries
    /// treat this as a no-op.
    fn refresh(&mut self) -> Result<(), RegistryError>;

    /// Is the fullname an installed, resolvable model right now?
    fn is_installed(&self, fullname: &str, concrete_required: bool) -> bool {
        match self.model_class(fullname) {
            Some(model) => {
                if concrete_required && model.is_abstract {
                    return false;
                }
                self.installed_apps()
                    .iter()
                    .any(|app| *app == model.app_label)
            }
            None => false,
        }
    }

    fn apps_snapshot(&self) -> InstalledAppsSnapshot {
        InstalledAppsSnapshot::new(self.installed_apps().to_vec())
    }
}

/// A registry held entirely in memory.
///
/// Backs [`crate::ProjectRegistry`] and every test that needs to mutate
/// registry state mid-scenario (app removal, model edits).
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    models: FxHashMap<String, ModelClass>,
    model_modules: IndexMap<String, IndexMap<String, String>>,
    installed_apps: Vec<String>,
    module_sources: FxHashMap<String, String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_installed_apps(&mut self, apps: Vec<String>) {
        self.installed_apps = apps;
    }

    pub fn insert_model(&mut self, mut model: ModelClass) {
        model.normalize();
        self.model_modules
            .entry(model.module.clone())
            .or_default()
            .insert(model.name().to_string(), model.fullname.clone());
        self.models.insert(model.fullname.clone(), model);
    }

    pub fn set_module_source(&mut self, module: &str, source: &str) {
        self.module_sources
            .insert(module.to_string(), source.to_string());
    }

    /// Remove an application and every model it registered, as happens when
    /// the installed-apps list shrinks mid-session.
    pub fn remove_app(&mut self, app_label: &str) {
        self.installed_apps.retain(|app| app != app_label);
        let doomed: Vec<String> = self
            .models
            .values()
            .filter(|model| model.app_label == app_label)
            .map(|model| model.fullname.clone())
            .collect();
        for fullname in doomed {
            if let Some(model) = self.models.remove(&fullname) {
                if let Some(by_name) = self.model_modules.get_mut(&model.module) {
                    by_name.shift_remove(model.name());
                    if by_name.is_empty() {
                        self.model_modules.shift_remove(&model.module);
                    }
                }
            }
        }
        tracing::debug!(app = app_label, "removed application from registry");
    }
}

impl ModelRegistry for InMemoryRegistry {
    fn model_class(&self, fullname: &str) -> Option<&ModelClass> {
        self.models.get(fullname)
    }

    fn model_modules(&self) -> &IndexMap<String, IndexMap<String, String>> {
        &self.model_modules
    }

    fn installed_apps(&self) -> &[String] {
        &self.installed_apps
    }

    fn module_source(&self, module: &str) -> Option<&str> {
        self.module_sources.get(module).map(String::as_str)
    }

    fn refresh(&mut self) -> Result<(), RegistryError> {
        Ok(())
    }
}

//! JSON project-manifest backed registry.
//!
//! The settings-module identifier is opaque to the rest of the system; here
//! it names a JSON manifest (`<settings_dir>/<settings_module>.json`)
//! describing the installed applications and every registered model class.
//! `refresh()` re-reads the manifest, which is how mid-session application
//! changes become visible without a process restart.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::model::ModelClass;
use crate::registry::{InMemoryRegistry, ModelRegistry, RegistryError};

/// Environment variable pointing at the directory holding project manifests.
/// Defaults to the current directory.
pub const SETTINGS_DIR_VAR: &str = "ORMTYPE_SETTINGS_DIR";

#[derive(Debug, Deserialize)]
struct ProjectManifest {
    installed_apps: Vec<String>,
    #[serde(default)]
    models: Vec<ModelClass>,
    #[serde(default)]
    module_sources: BTreeMap<String, String>,
}

/// A registry populated from a project manifest on disk.
#[derive(Debug)]
pub struct ProjectRegistry {
    settings_module: String,
    manifest_path: PathBuf,
    inner: InMemoryRegistry,
}

impl ProjectRegistry {
    /// Load the manifest named by the settings module, resolving the
    /// directory from [`SETTINGS_DIR_VAR`] or falling back to the cwd.
    pub fn load(settings_module: &str) -> Result<Self, RegistryError> {
        let dir = std::env::var(SETTINGS_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        Self::load_from(settings_module, &dir)
    }

    pub fn load_from(settings_module: &str, dir: &Path) -> Result<Self, RegistryError> {
        let manifest_path = dir.join(format!("{settings_module}.json"));
        let mut registry = Self {
            settings_module: settings_module.to_string(),
            manifest_path,
            inner: InMemoryRegistry::new(),
        };
        registry.reload()?;
        Ok(registry)
    }

    pub fn settings_module(&self) -> &str {
        &self.settings_module
    }

    fn reload(&mut self) -> Result<(), RegistryError> {
        let path = self.manifest_path.display().to_string();
        let raw = match std::fs::read_to_string(&self.manifest_path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Err(RegistryError::MissingManifest {
                    settings_module: self.settings_module.clone(),
                    path,
                });
            }
            Err(source) => return Err(RegistryError::Io { path, source }),
        };
        let manifest: ProjectManifest = serde_json::from_str(&raw)
            .map_err(|source| RegistryError::MalformedManifest { path, source })?;

        let mut inner = InMemoryRegistry::new();
        inner.set_installed_apps(manifest.installed_apps);
        for model in manifest.models {
            inner.insert_model(model);
        }
        for (module, source) in &manifest.module_sources {
            inner.set_module_source(module, source);
        }
        tracing::debug!(
            settings_module = %self.settings_module,
            models = inner.model_modules().values().map(IndexMap::len).sum::<usize>(),
            "loaded project manifest"
        );
        self.inner = inner;
        Ok(())
    }
}

impl ModelRegistry for ProjectRegistry {
    fn model_class(&self, fullname: &str) -> Option<&ModelClass> {
        self.inner.model_class(fullname)
    }

    fn model_modules(&self) -> &IndexMap<String, IndexMap<String, String>> {
        self.inner.model_modules()
    }

    fn installed_apps(&self) -> &[String] {
        self.inner.installed_apps()
    }

    fn module_source(&self, module: &str) -> Option<&str> {
        self.inner.module_source(module)
    }

    fn refresh(&mut self) -> Result<(), RegistryError> {
        self.reload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "installed_apps": ["shop"],
        "models": [
            {
                "fullname": "shop.models.Item",
                "app_label": "shop",
                "bases": ["shop.models.Base"]
            }
        ],
        "module_sources": {
            "shop.models": "import ormlib\n"
        }
    }"#;

    #[test]
    fn test_load_and_refresh_pick_up_manifest_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proj.settings.json");
        std::fs::write(&path, MANIFEST).unwrap();

        let mut registry = ProjectRegistry::load_from("proj.settings", dir.path()).unwrap();
        assert_eq!(registry.installed_apps(), ["shop".to_string()]);
        assert!(registry.model_class("shop.models.Item").is_some());
        assert_eq!(
            registry.module_source("shop.models"),
            Some("import ormlib\n")
        );
        // Module was derived from the fullname.
        assert_eq!(
            registry.model_class("shop.models.Item").unwrap().module,
            "shop.models"
        );

        std::fs::write(&path, MANIFEST.replace("\"shop\"]", "\"shop\", \"blog\"]")).unwrap();
        registry.refresh().unwrap();
        assert_eq!(
            registry.installed_apps(),
            ["shop".to_string(), "blog".to_string()]
        );
    }

    #[test]
    fn test_missing_manifest_is_a_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectRegistry::load_from("nope.settings", dir.path()).unwrap_err();
        assert!(matches!(err, RegistryError::MissingManifest { .. }));
    }

    #[test]
    fn test_malformed_manifest_is_a_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.settings.json"), "{ not json").unwrap();
        let err = ProjectRegistry::load_from("bad.settings", dir.path()).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedManifest { .. }));
    }
}

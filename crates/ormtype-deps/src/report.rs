//! The on-disk dependency report.
//!
//! A directory holding a JSON manifest (`all.lines`) plus one small marker
//! file per tracked module. The marker's only job is to go byte-different
//! exactly when the module's dependency summary changes; the host checker's
//! content-sensitive cache then invalidates everything that depends on the
//! marker. Unchanged files are never rewritten, so a recompute with no
//! source changes touches nothing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use ormtype_common::hashing::stable_hash_hex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MANIFEST_NAME: &str = "all.lines";
const MANIFEST_VERSION: &str = "json.1";
const MARKER_SUFFIX: &str = ".dep";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("could not {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode report manifest: {0}")]
    Encode(#[from] serde_json::Error),
}

fn io_err(action: &'static str, path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        action,
        path: path.display().to_string(),
        source,
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    version: String,
    prefix: String,
    /// module fullname -> dependency summary. Sorted for stable bytes.
    modules: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ModuleSlot {
    summary: String,
    /// Advances only when the summary changes, never on recompute alone.
    epoch: u64,
}

/// Stem of a module's marker file, content-addressed by module name so
/// renames in the project cannot collide.
fn marker_stem(module: &str) -> String {
    format!("mod_{}", stable_hash_hex(module.as_bytes()))
}

/// The report directory and its in-memory mirror.
#[derive(Debug)]
pub struct ReportStore {
    root: PathBuf,
    prefix: String,
    slots: IndexMap<String, ModuleSlot>,
}

impl ReportStore {
    /// Open (or create) the report directory and read prior state.
    ///
    /// A manifest with the wrong version or prefix, or one that fails to
    /// parse, is discarded wholesale; the next write regenerates everything
    /// and the host re-analyzes, which is always safe.
    pub fn open(root: &Path, prefix: &str) -> Result<Self, ReportError> {
        std::fs::create_dir_all(root).map_err(|source| io_err("create", root, source))?;
        let mut store = Self {
            root: root.to_path_buf(),
            prefix: prefix.to_string(),
            slots: IndexMap::new(),
        };

        let manifest_path = store.root.join(MANIFEST_NAME);
        let Ok(raw) = std::fs::read_to_string(&manifest_path) else {
            return Ok(store);
        };
        let manifest: ManifestFile = match serde_json::from_str(&raw) {
            Ok(manifest) => manifest,
            Err(error) => {
                tracing::warn!(%error, "discarding unreadable report manifest");
                return Ok(store);
            }
        };
        if manifest.version != MANIFEST_VERSION || manifest.prefix != prefix {
            tracing::warn!(
                found_version = %manifest.version,
                found_prefix = %manifest.prefix,
                "discarding report manifest from another layout"
            );
            return Ok(store);
        }

        for (module, summary) in manifest.modules {
            let epoch = store.read_epoch(&module);
            store.slots.insert(module, ModuleSlot { summary, epoch });
        }
        Ok(store)
    }

    fn read_epoch(&self, module: &str) -> u64 {
        let path = self.marker_path(module);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return 0;
        };
        content
            .lines()
            .find_map(|line| line.strip_prefix("epoch: "))
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    fn marker_path(&self, module: &str) -> PathBuf {
        self.root
            .join(format!("{}{MARKER_SUFFIX}", marker_stem(module)))
    }

    /// The pseudo-module name of a module's marker, used as a synthetic
    /// dependency edge so the host tracks the marker file.
    pub fn marker_module(&self, module: &str) -> String {
        format!("{}.{}", self.prefix, marker_stem(module))
    }

    pub fn contains(&self, module: &str) -> bool {
        self.slots.contains_key(module)
    }

    pub fn summary_of(&self, module: &str) -> Option<&str> {
        self.slots.get(module).map(|slot| slot.summary.as_str())
    }

    pub fn epoch_of(&self, module: &str) -> u64 {
        self.slots.get(module).map_or(0, |slot| slot.epoch)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Record a module's summary. Returns whether it changed, in which case
    /// the epoch advances and the next `write` rewrites the marker.
    pub fn set_summary(&mut self, module: &str, summary: &str) -> bool {
        match self.slots.get_mut(module) {
            Some(slot) if slot.summary == summary => false,
            Some(slot) => {
                slot.summary = summary.to_string();
                slot.epoch += 1;
                true
            }
            None => {
                self.slots.insert(
                    module.to_string(),
                    ModuleSlot {
                        summary: summary.to_string(),
                        epoch: 0,
                    },
                );
                true
            }
        }
    }

    /// Drop slots for modules that no longer exist; their marker files are
    /// deleted on the next `write`.
    pub fn retain_modules(&mut self, keep: impl Fn(&str) -> bool) {
        self.slots.retain(|module, _| keep(module));
    }

    fn manifest_bytes(&self) -> Result<String, ReportError> {
        let manifest = ManifestFile {
            version: MANIFEST_VERSION.to_string(),
            prefix: self.prefix.clone(),
            modules: self
                .slots
                .iter()
                .map(|(module, slot)| (module.clone(), slot.summary.clone()))
                .collect(),
        };
        Ok(format!("{}\n", serde_json::to_string_pretty(&manifest)?))
    }

    fn marker_bytes(&self, module: &str, slot: &ModuleSlot) -> String {
        format!(
            "{module} |>> {prefix}.{summary}\nepoch: {epoch}\n",
            prefix = self.prefix,
            summary = slot.summary,
            epoch = slot.epoch,
        )
    }

    /// Fingerprint of the manifest content, for the cross-process version
    /// check.
    pub fn manifest_fingerprint(&self) -> Result<String, ReportError> {
        Ok(stable_hash_hex(self.manifest_bytes()?.as_bytes()))
    }

    /// Write the report to disk. Files whose bytes are unchanged are left
    /// untouched; changed files are staged in a scratch directory inside the
    /// report root and renamed into place, so a crash mid-write leaves every
    /// slot either old or new, never torn. Returns the number of files
    /// actually written.
    pub fn write(&self) -> Result<usize, ReportError> {
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)
            .map_err(|source| io_err("stage in", &self.root, source))?;

        let mut desired: Vec<(PathBuf, String)> =
            vec![(self.root.join(MANIFEST_NAME), self.manifest_bytes()?)];
        for (module, slot) in &self.slots {
            desired.push((self.marker_path(module), self.marker_bytes(module, slot)));
        }

        let mut written = 0;
        for (index, (path, content)) in desired.iter().enumerate() {
            let existing = std::fs::read_to_string(path).ok();
            if existing.as_deref() == Some(content.as_str()) {
                continue;
            }
            let staged = staging.path().join(format!("slot-{index}"));
            std::fs::write(&staged, content).map_err(|source| io_err("write", &staged, source))?;
            std::fs::rename(&staged, path).map_err(|source| io_err("move into", path, source))?;
            written += 1;
        }

        let live: FxHashSet<PathBuf> = desired.into_iter().map(|(path, _)| path).collect();
        let entries =
            std::fs::read_dir(&self.root).map_err(|source| io_err("list", &self.root, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| io_err("list", &self.root, source))?;
            let path = entry.path();
            let is_stale_marker = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("mod_") && name.ends_with(MARKER_SUFFIX))
                && !live.contains(&path);
            if is_stale_marker {
                tracing::debug!(path = %path.display(), "removing stale marker");
                std::fs::remove_file(&path).map_err(|source| io_err("remove", &path, source))?;
            }
        }

        if written > 0 {
            tracing::debug!(written, root = %self.root.display(), "report updated");
        }
        Ok(written)
    }
}

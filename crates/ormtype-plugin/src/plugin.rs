//! The plugin facade.
//!
//! One object owning every long-lived component: the registry, the children
//! store, the queryset and annotation resolvers, and the dependency tracker.
//! Host extension points map onto its methods, and this is the single error
//! boundary: components return `Outcome`/`RestartRequired`, and only here do
//! they become host deferrals, diagnostics, or restart instructions.

use std::process::Command;

use ormtype_common::diagnostics::{Diagnostic, Location};
use ormtype_common::fullnames::{KnownAnnotation, CONCRETE_CLASS_FULLNAME, TYPE_VAR_METHOD};
use ormtype_common::host::{HostApi, HostLookup};
use ormtype_common::outcome::{Outcome, RestartRequired};
use ormtype_common::typeref::TypeRef;
use ormtype_deps::report::ReportError;
use ormtype_deps::tracker::{Dep, DepTracker, DepsError, RecomputeOutcome};
use ormtype_registry::{InstalledAppsSnapshot, ModelRegistry, RegistryError};
use ormtype_resolver::callsite::{rewrite_return_type, CallInfo};
use ormtype_resolver::guard::{screen_type_guard, SignatureInfo};
use ormtype_resolver::resolve::{AnnotationResolver, ResolveContext};
use ormtype_resolver::typevars::{
    create_concrete_type_var, TypeVarDef, TypeVarOutcome, TypeVarRequest,
};
use ormtype_store::{ChildrenStore, QuerysetResolver};
use thiserror::Error;

use crate::config::PluginConfig;
use crate::hooks::HookOutcome;

/// Namespace prefix for report pseudo-modules and the manifest.
pub const REPORT_PREFIX: &str = "__ormtype_report__";

#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Deps(#[from] DepsError),
    #[error("installed-apps script {script} failed: {message}")]
    AppsScript { script: String, message: String },
}

/// How long this process lives.
///
/// Explicit constructor input rather than an ambient flag: a daemon carries
/// state across runs and must answer version checks; a one-shot run never
/// does either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessLifetime {
    pub daemon: bool,
}

impl ProcessLifetime {
    pub fn daemon() -> Self {
        Self { daemon: true }
    }

    pub fn one_shot() -> Self {
        Self { daemon: false }
    }
}

/// The checker extension, generic over the registry backing it.
#[derive(Debug)]
pub struct OrmTypePlugin<R: ModelRegistry> {
    config: PluginConfig,
    lifetime: ProcessLifetime,
    registry: R,
    children: ChildrenStore,
    querysets: QuerysetResolver,
    resolver: AnnotationResolver,
    tracker: DepTracker,
}

impl<R: ModelRegistry> OrmTypePlugin<R> {
    pub fn new(
        config: PluginConfig,
        registry: R,
        lifetime: ProcessLifetime,
    ) -> Result<Self, PluginError> {
        let report_root = config.scratch_path.join("reports");
        let tracker = DepTracker::open(&report_root, REPORT_PREFIX, &config.settings_module)?;
        let mut plugin = Self {
            config,
            lifetime,
            registry,
            children: ChildrenStore::new(),
            querysets: QuerysetResolver::new(),
            resolver: AnnotationResolver::new(),
            tracker,
        };
        plugin.tracker.recompute(&plugin.registry)?;
        Ok(plugin)
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn children(&self) -> &ChildrenStore {
        &self.children
    }

    // choose phase

    /// Which annotation, if any, a type-analysis hook should intercept.
    pub fn annotation_for(&self, fullname: &str) -> Option<KnownAnnotation> {
        KnownAnnotation::from_fullname(fullname)
    }

    /// Whether a dynamic-class hook should intercept this callee.
    pub fn handles_dynamic_class(&self, fullname: &str) -> bool {
        fullname
            .strip_prefix(CONCRETE_CLASS_FULLNAME)
            .and_then(|rest| rest.strip_prefix('.'))
            == Some(TYPE_VAR_METHOD)
    }

    /// Whether a call to this function needs return-type rewriting.
    pub fn handles_call(&self, callee_fullname: &str) -> bool {
        self.resolver.is_registered(callee_fullname)
    }

    // run phase

    /// Resolve one annotation site. Deferral and diagnostics go through the
    /// host; the returned type is what the host substitutes.
    pub fn analyze_type(&mut self, ctx: &ResolveContext<'_>, host: &dyn HostApi) -> TypeRef {
        match self.resolver.resolve(
            ctx,
            &mut self.children,
            &mut self.querysets,
            &self.registry,
            host,
        ) {
            Ok(outcome) => apply_outcome(outcome, ctx.unanalyzed, host),
            Err(restart) => escalate_restart(&restart, &ctx.location, host),
        }
    }

    /// The `type_var` dynamic-class path: synthesize a type variable valued
    /// over an abstract class's concrete descendants.
    pub fn define_type_var(
        &mut self,
        request: &TypeVarRequest<'_>,
        host: &dyn HostApi,
    ) -> Option<TypeVarDef> {
        match create_concrete_type_var(request, &mut self.children, &self.registry, host) {
            TypeVarOutcome::Created(def) => Some(def),
            TypeVarOutcome::Defer => {
                host.defer();
                None
            }
            TypeVarOutcome::Failed(diagnostic) => {
                host.fail(&diagnostic);
                None
            }
        }
    }

    /// Attribute access on a resolved union: resolve per member through the
    /// host and re-union. Delegates for non-union receivers and whenever any
    /// member fails to resolve the attribute.
    pub fn resolve_union_attribute(
        &self,
        receiver: &TypeRef,
        name: &str,
        host: &dyn HostApi,
    ) -> HookOutcome<TypeRef> {
        let TypeRef::Union(members) = receiver else {
            return HookOutcome::Delegate;
        };
        let mut resolved = Vec::with_capacity(members.len());
        for member in members {
            match host.resolve_attribute(member, name) {
                Some(member_type) => resolved.push(member_type),
                None => return HookOutcome::Delegate,
            }
        }
        HookOutcome::Handled(TypeRef::union(resolved))
    }

    /// Return-type follow-up for calls to registered functions.
    pub fn rewrite_call_return(
        &mut self,
        call: &CallInfo,
        host: &dyn HostApi,
    ) -> HookOutcome<TypeRef> {
        match rewrite_return_type(
            &mut self.resolver,
            call,
            &mut self.children,
            &mut self.querysets,
            &self.registry,
            host,
        ) {
            Ok(Some(outcome)) => {
                HookOutcome::Handled(apply_outcome(outcome, &call.declared_return, host))
            }
            Ok(None) => HookOutcome::Delegate,
            Err(restart) => HookOutcome::Handled(escalate_restart(&restart, &call.location, host)),
        }
    }

    /// Signature screening; returns whether the signature was rejected.
    pub fn screen_signature(&self, sig: &SignatureInfo, host: &dyn HostApi) -> bool {
        match screen_type_guard(sig) {
            Some(diagnostic) => {
                host.fail(&diagnostic);
                true
            }
            None => false,
        }
    }

    /// Fired once per class the host defines; populates the children store.
    pub fn class_defined(&mut self, fullname: &str, host: &dyn HostLookup) {
        self.children
            .fill_out_concrete_children(fullname, host, &self.registry);
    }

    pub fn recompute_deps(&mut self) -> Result<RecomputeOutcome, PluginError> {
        Ok(self.tracker.recompute(&self.registry)?)
    }

    /// The per-file dependency hook. In daemon runs this is also where
    /// registry drift is detected and repaired before answering.
    pub fn additional_deps(
        &mut self,
        module: &str,
        super_deps: &[Dep],
        unresolvable: &[String],
    ) -> Result<Vec<Dep>, PluginError> {
        if self.lifetime.daemon {
            let refreshed = self.tracker.refresh_if_unresolvable(
                unresolvable,
                &mut self.registry,
                &mut self.children,
            );
            match refreshed {
                Ok(_) => {}
                Err(error) if !self.config.strict_settings => {
                    tracing::warn!(%error, "registry refresh failed; continuing with stale state");
                }
                Err(error) => return Err(error.into()),
            }
        }
        Ok(self.tracker.for_file(module, super_deps))
    }

    /// Version fingerprint for the daemon's cross-run check; a change tells
    /// it to restart the process. One-shot runs have no version.
    pub fn plugin_version(&self) -> Result<Option<String>, PluginError> {
        if !self.lifetime.daemon {
            return Ok(None);
        }
        let snapshot = self.apps_snapshot()?;
        Ok(Some(self.tracker.version_fingerprint(&snapshot)?))
    }

    pub fn report_config_data(&self) -> serde_json::Value {
        self.config.config_data_for_cache()
    }

    /// The installed-apps snapshot, from the configured dump script when one
    /// is set (so the fingerprint reflects the project's own environment),
    /// otherwise from the in-process registry.
    fn apps_snapshot(&self) -> Result<InstalledAppsSnapshot, PluginError> {
        let Some(script) = &self.config.installed_apps_script else {
            return Ok(self.registry.apps_snapshot());
        };
        let script_name = script.display().to_string();
        let apps_script_err = |message: String| PluginError::AppsScript {
            script: script_name.clone(),
            message,
        };

        let apps_file = tempfile::NamedTempFile::new()
            .map_err(|source| apps_script_err(format!("could not create apps file: {source}")))?;
        let status = Command::new(script)
            .arg("--settings-module")
            .arg(&self.config.settings_module)
            .arg("--apps-file")
            .arg(apps_file.path())
            .status()
            .map_err(|source| apps_script_err(source.to_string()))?;
        if !status.success() {
            return Err(apps_script_err(format!("exited with {status}")));
        }
        let raw = std::fs::read_to_string(apps_file.path())
            .map_err(|source| apps_script_err(format!("could not read apps file: {source}")))?;
        Ok(InstalledAppsSnapshot::from_lines(&raw))
    }
}

fn apply_outcome(outcome: Outcome, unanalyzed: &TypeRef, host: &dyn HostApi) -> TypeRef {
    match outcome {
        Outcome::Resolved(resolved) => resolved,
        Outcome::Defer => {
            host.defer();
            unanalyzed.clone()
        }
        Outcome::Failed(diagnostic) => {
            host.fail(&diagnostic);
            TypeRef::Error
        }
    }
}

fn escalate_restart(
    restart: &RestartRequired,
    location: &Location,
    host: &dyn HostApi,
) -> TypeRef {
    tracing::error!(%restart, "escalating restart fault");
    host.fail(&Diagnostic::new(restart.to_string(), location.clone()));
    TypeRef::Error
}

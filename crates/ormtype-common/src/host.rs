//! The host-checker seam.
//!
//! The host checker owns parsing, semantic analysis, and the type algebra.
//! The plugin sees it only through these traits: a name-lookup surface that
//! succeeds for classes already analyzed this pass, and a small per-pass API
//! for deferral, diagnostics, and attribute resolution.

use crate::diagnostics::Diagnostic;
use crate::fullnames::MODEL_CLASS_FULLNAME;
use crate::typeref::TypeRef;

/// What the host knows about an analyzed class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub fullname: String,
    /// Fullname of the defining module.
    pub module: String,
    /// Whether the class is declared abstract in its model options.
    pub is_abstract: bool,
    /// Linearized ancestors, nearest first, excluding the class itself.
    pub mro: Vec<String>,
    /// Number of type parameters on the class (0 for non-generic classes).
    pub type_var_count: usize,
}

impl ClassInfo {
    /// Whether the class descends from the ORM's model root.
    pub fn is_model(&self) -> bool {
        self.mro.iter().any(|base| base == MODEL_CLASS_FULLNAME)
    }

    pub fn is_generic(&self) -> bool {
        self.type_var_count > 0
    }
}

/// Name lookup against the host's symbol tables.
///
/// Returns `None` both for unknown names and for classes whose defining
/// module has not been analyzed yet this pass; callers that need the
/// distinction must defer and retry on a later pass.
pub trait HostLookup {
    fn lookup_class(&self, fullname: &str) -> Option<ClassInfo>;

    /// A bare instance of the named class, when the host can resolve it.
    fn named_instance(&self, fullname: &str) -> Option<TypeRef> {
        self.lookup_class(fullname)
            .map(|info| TypeRef::instance(info.fullname))
    }
}

/// The per-pass API handed to hooks by the host checker.
pub trait HostApi: HostLookup {
    /// True on the last scheduled analysis pass; deferral is no longer an
    /// option and empty resolutions become diagnostics.
    fn final_iteration(&self) -> bool;

    /// Request another analysis pass for the current file.
    fn defer(&self);

    /// Report a diagnostic through the host's channel.
    fn fail(&self, diagnostic: &Diagnostic);

    /// Resolve an attribute looked up on a single instance, using the host's
    /// member-resolution machinery.
    fn resolve_attribute(&self, receiver: &TypeRef, name: &str) -> Option<TypeRef>;
}

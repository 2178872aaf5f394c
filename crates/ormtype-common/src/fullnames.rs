//! Well-known fullnames and the special annotation identities.
//!
//! The plugin only ever intercepts a handful of names: the ORM's model and
//! queryset roots, and the three generic annotations it rewrites.

/// Root class every model inherits from. Never treated as an abstract parent
/// of interest in its own right.
pub const MODEL_CLASS_FULLNAME: &str = "ormlib.models.Model";

/// The generic default queryset, parameterized by the model it queries.
pub const QUERYSET_CLASS_FULLNAME: &str = "ormlib.querysets.QuerySet";

/// The runtime companion class of the `Concrete` annotation. Its `type_var`
/// classmethod is intercepted by the dynamic-class hook.
pub const CONCRETE_CLASS_FULLNAME: &str = "ormtype.annotations.Concrete";

/// Name of the classmethod that synthesizes a concrete-subclass type variable.
pub const TYPE_VAR_METHOD: &str = "type_var";

pub const CONCRETE_ANNOTATION: &str = "ormtype.annotations.Concrete";
pub const CONCRETE_QUERYSET_ANNOTATION: &str = "ormtype.annotations.ConcreteQuerySet";
pub const DEFAULT_QUERYSET_ANNOTATION: &str = "ormtype.annotations.DefaultQuerySet";

/// The three annotations the resolver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownAnnotation {
    /// Union of the concrete descendants of the argument.
    Concrete,
    /// Union of the default querysets of the concrete descendants.
    ConcreteQuerySet,
    /// The default queryset of exactly the argument, unexpanded.
    DefaultQuerySet,
}

impl KnownAnnotation {
    pub fn from_fullname(fullname: &str) -> Option<Self> {
        match fullname {
            CONCRETE_ANNOTATION => Some(Self::Concrete),
            CONCRETE_QUERYSET_ANNOTATION => Some(Self::ConcreteQuerySet),
            DEFAULT_QUERYSET_ANNOTATION => Some(Self::DefaultQuerySet),
            _ => None,
        }
    }

    pub fn fullname(self) -> &'static str {
        match self {
            Self::Concrete => CONCRETE_ANNOTATION,
            Self::ConcreteQuerySet => CONCRETE_QUERYSET_ANNOTATION,
            Self::DefaultQuerySet => DEFAULT_QUERYSET_ANNOTATION,
        }
    }
}

/// Module part of a dotted fullname (`"a.b.C"` -> `"a.b"`).
pub fn module_of(fullname: &str) -> &str {
    match fullname.rsplit_once('.') {
        Some((module, _)) => module,
        None => fullname,
    }
}

/// Unqualified name part of a dotted fullname (`"a.b.C"` -> `"C"`).
pub fn short_name(fullname: &str) -> &str {
    match fullname.rsplit_once('.') {
        Some((_, name)) => name,
        None => fullname,
    }
}

//! The exchange type representation.
//!
//! `TypeRef` is the shape in which types cross the seam between the host
//! checker and the plugin. It deliberately models only what the resolution
//! algorithms need: instances, unions, class objects, type variables, the
//! self type, placeholders for not-yet-analyzed classes, and an error marker.
//! Union construction and subtyping proper remain host primitives; the
//! helpers here only normalize shapes on the way in and out.

/// A type as exchanged with the host checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// An instance of a named class, possibly with type arguments.
    Instance { fullname: String, args: Vec<TypeRef> },
    /// A union of types. May be empty (the uninhabited fallback).
    Union(Vec<TypeRef>),
    /// The class object itself rather than an instance (`type[X]`).
    ClassObject(Box<TypeRef>),
    /// An unbound type variable, identified by name.
    TypeVar { name: String },
    /// The enclosing class of a method, bound at resolution time.
    SelfType,
    /// A class whose defining module has not been analyzed yet this pass.
    Placeholder { fullname: String },
    /// The host's error marker type; produced after a diagnostic.
    Error,
}

impl TypeRef {
    pub fn instance(fullname: impl Into<String>) -> Self {
        Self::Instance {
            fullname: fullname.into(),
            args: Vec::new(),
        }
    }

    pub fn instance_with_args(fullname: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self::Instance {
            fullname: fullname.into(),
            args,
        }
    }

    pub fn type_var(name: impl Into<String>) -> Self {
        Self::TypeVar { name: name.into() }
    }

    pub fn class_object(inner: TypeRef) -> Self {
        Self::ClassObject(Box::new(inner))
    }

    /// Build a union from already-resolved members, flattening nested unions.
    /// A single member collapses to itself; no members yields the empty union.
    pub fn union(items: Vec<TypeRef>) -> Self {
        let mut flat = Vec::with_capacity(items.len());
        for item in items {
            match item {
                TypeRef::Union(members) => flat.extend(members),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(TypeRef::Union(Vec::new()))
        } else {
            TypeRef::Union(flat)
        }
    }

    /// The class fullname when this is a plain instance.
    pub fn instance_fullname(&self) -> Option<&str> {
        match self {
            TypeRef::Instance { fullname, .. } => Some(fullname),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TypeRef::Error)
    }
}

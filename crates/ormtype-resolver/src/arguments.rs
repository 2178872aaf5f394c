//! The shared argument-analysis pipeline.
//!
//! Every annotation takes exactly one type argument. This module normalizes
//! that argument into either an ordered set of class fullnames or a type
//! variable, preserving the class-object (`type[...]`) wrapper and binding
//! the self type against the receiver before anything else looks at it.

use ormtype_common::diagnostics::{Diagnostic, Location};
use ormtype_common::typeref::TypeRef;

/// A class-set argument, post-normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArgument {
    /// Class fullnames in written order.
    pub members: Vec<String>,
    /// Whether the argument was wrapped as a class object; the result must
    /// be re-wrapped the same way.
    pub class_object: bool,
}

/// What the single annotation argument turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentKind {
    Classes(ParsedArgument),
    /// Resolution must wait for a call site to bind the variable.
    TypeVar { name: String },
}

fn malformed(location: &Location) -> Diagnostic {
    Diagnostic::new(
        "annotation argument must be a model class, a union of model classes, \
         or a type variable",
        location.clone(),
    )
}

/// Normalize the sole type argument of an annotation.
pub fn parse_argument(
    arg: &TypeRef,
    receiver: Option<&TypeRef>,
    location: &Location,
) -> Result<ArgumentKind, Diagnostic> {
    let (inner, class_object) = match arg {
        TypeRef::ClassObject(inner) => (inner.as_ref(), true),
        other => (other, false),
    };

    match inner {
        TypeRef::Instance { fullname, .. } => Ok(ArgumentKind::Classes(ParsedArgument {
            members: vec![fullname.clone()],
            class_object,
        })),
        TypeRef::SelfType => {
            let bound = receiver.and_then(TypeRef::instance_fullname);
            match bound {
                Some(fullname) => Ok(ArgumentKind::Classes(ParsedArgument {
                    members: vec![fullname.to_string()],
                    class_object,
                })),
                None => Err(Diagnostic::new(
                    "Self in this annotation requires a method on a model class",
                    location.clone(),
                )),
            }
        }
        TypeRef::TypeVar { name } if !class_object => Ok(ArgumentKind::TypeVar {
            name: name.clone(),
        }),
        TypeRef::Union(items) if !items.is_empty() => {
            let mut members = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    TypeRef::Instance { fullname, .. } => members.push(fullname.clone()),
                    _ => {
                        return Err(Diagnostic::new(
                            "union members must be plain model classes",
                            location.clone(),
                        ));
                    }
                }
            }
            Ok(ArgumentKind::Classes(ParsedArgument {
                members,
                class_object,
            }))
        }
        _ => Err(malformed(location)),
    }
}

//! Shared test fixtures.
//!
//! A scriptable in-memory stand-in for the host checker, used by unit and
//! integration tests across the workspace. Not compiled out of test builds
//! because downstream crates use it from their own `tests/` directories.

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;

use crate::diagnostics::Diagnostic;
use crate::host::{ClassInfo, HostApi, HostLookup};
use crate::typeref::TypeRef;

/// An in-memory host checker.
///
/// Classes become visible via [`FakeHost::add_class`]; everything else
/// resolves to `None`, which is exactly how a module that has not been
/// analyzed yet this pass behaves.
#[derive(Debug, Default)]
pub struct FakeHost {
    classes: FxHashMap<String, ClassInfo>,
    attributes: FxHashMap<(String, String), TypeRef>,
    final_iteration: bool,
    failures: RefCell<Vec<Diagnostic>>,
    deferrals: Cell<usize>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host on its final analysis pass.
    pub fn final_pass() -> Self {
        Self {
            final_iteration: true,
            ..Self::default()
        }
    }

    pub fn add_class(&mut self, info: ClassInfo) -> &mut Self {
        self.classes.insert(info.fullname.clone(), info);
        self
    }

    /// Convenience for registering a class with the given ancestors.
    pub fn add_simple_class(
        &mut self,
        fullname: &str,
        is_abstract: bool,
        mro: &[&str],
    ) -> &mut Self {
        self.add_class(ClassInfo {
            fullname: fullname.to_string(),
            module: crate::fullnames::module_of(fullname).to_string(),
            is_abstract,
            mro: mro.iter().map(|base| base.to_string()).collect(),
            type_var_count: 0,
        })
    }

    /// Make the host forget a class, simulating a file edit that removed it.
    pub fn remove_class(&mut self, fullname: &str) {
        self.classes.remove(fullname);
    }

    pub fn set_final_iteration(&mut self, final_iteration: bool) {
        self.final_iteration = final_iteration;
    }

    /// Script the result of attribute resolution on a member instance.
    pub fn add_attribute(&mut self, receiver_fullname: &str, name: &str, resolved: TypeRef) {
        self.attributes
            .insert((receiver_fullname.to_string(), name.to_string()), resolved);
    }

    pub fn failures(&self) -> Vec<Diagnostic> {
        self.failures.borrow().clone()
    }

    pub fn deferral_count(&self) -> usize {
        self.deferrals.get()
    }
}

impl HostLookup for FakeHost {
    fn lookup_class(&self, fullname: &str) -> Option<ClassInfo> {
        self.classes.get(fullname).cloned()
    }
}

impl HostApi for FakeHost {
    fn final_iteration(&self) -> bool {
        self.final_iteration
    }

    fn defer(&self) {
        self.deferrals.set(self.deferrals.get() + 1);
    }

    fn fail(&self, diagnostic: &Diagnostic) {
        self.failures.borrow_mut().push(diagnostic.clone());
    }

    fn resolve_attribute(&self, receiver: &TypeRef, name: &str) -> Option<TypeRef> {
        let fullname = receiver.instance_fullname()?;
        self.attributes
            .get(&(fullname.to_string(), name.to_string()))
            .cloned()
    }
}

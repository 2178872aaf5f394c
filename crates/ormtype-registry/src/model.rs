//! Model class and manager descriptors.

use ormtype_common::fullnames::{module_of, short_name};
use serde::Deserialize;

/// The default manager of a model, as the registry sees it at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManagerDesc {
    /// Fullname of the manager's class.
    pub fullname: String,
    /// Fullname of the manager class's immediate base class. Generated
    /// managers share a base, which is where the generation metadata lives.
    pub base_fullname: String,
    /// Queryset class this manager was generated from, when the manager came
    /// out of a `from_queryset` style factory.
    #[serde(default)]
    pub from_queryset: Option<String>,
    /// A plain custom queryset class assigned on the manager directly.
    #[serde(default)]
    pub queryset_class: Option<String>,
}

/// A model class as registered at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelClass {
    pub fullname: String,
    /// Defining module; derived from the fullname when the manifest omits it.
    #[serde(default)]
    pub module: String,
    /// Label of the application that registered the model.
    pub app_label: String,
    #[serde(default)]
    pub is_abstract: bool,
    /// Ancestor model classes in linearization order, nearest first,
    /// excluding the ORM's own root.
    #[serde(default)]
    pub bases: Vec<String>,
    /// Models reached through declared relation fields.
    #[serde(default)]
    pub related_models: Vec<String>,
    /// Models that point back at this one through reverse relations.
    #[serde(default)]
    pub reverse_related_models: Vec<String>,
    /// Absent on abstract models, which are never instantiated.
    #[serde(default)]
    pub default_manager: Option<ManagerDesc>,
}

impl ModelClass {
    /// Unqualified class name.
    pub fn name(&self) -> &str {
        short_name(&self.fullname)
    }

    /// Fill in the module field from the fullname when the manifest left it
    /// empty. Called once at load time.
    pub(crate) fn normalize(&mut self) {
        if self.module.is_empty() {
            self.module = module_of(&self.fullname).to_string();
        }
    }
}

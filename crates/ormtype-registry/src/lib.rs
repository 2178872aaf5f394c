//! Registry adapter.
//!
//! A thin accessor over the application's live class registry: which model
//! classes currently exist, which applications are installed, and what the
//! default manager of each model looks like. The registry is externally
//! owned state; this crate only reads it (and re-reads it on refresh).

// Model class and manager descriptors
pub mod model;
pub use model::{ManagerDesc, ModelClass};

// The registry trait and the in-memory implementation
pub mod registry;
pub use registry::{InMemoryRegistry, ModelRegistry, RegistryError};

// JSON project-manifest backed registry
pub mod project;
pub use project::ProjectRegistry;

// Installed-apps snapshot and fingerprint
pub mod snapshot;
pub use snapshot::InstalledAppsSnapshot;

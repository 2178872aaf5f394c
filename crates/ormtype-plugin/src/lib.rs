//! The checker plugin: configuration, hook dispatch, and the facade that
//! wires the registry, children store, resolvers, and dependency tracker
//! into a host checker's extension points.

pub mod config;
pub use config::{ConfigError, PluginConfig, CONFIG_FILE};

pub mod hooks;
pub use hooks::HookOutcome;

pub mod plugin;
pub use plugin::{OrmTypePlugin, PluginError, ProcessLifetime, REPORT_PREFIX};

pub mod tracing_config;

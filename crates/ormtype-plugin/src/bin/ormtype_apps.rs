//! Dump the installed application list for a settings module.
//!
//! Run as a subprocess by the daemon layer to fingerprint registry state
//! without loading the project into its own process. Exits nonzero when the
//! project manifest cannot be loaded.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ormtype_registry::{ModelRegistry, ProjectRegistry};

#[derive(Debug, Parser)]
#[command(
    name = "ormtype-apps",
    about = "Write the ordered installed-app list for a settings module"
)]
struct Args {
    /// Settings-module identifier naming the project manifest.
    #[arg(long)]
    settings_module: String,

    /// File the app list is written to, one app per line.
    #[arg(long)]
    apps_file: PathBuf,
}

fn main() -> Result<()> {
    ormtype_plugin::tracing_config::init_tracing();
    let args = Args::parse();

    let registry = ProjectRegistry::load(&args.settings_module).with_context(|| {
        format!(
            "could not load the registry for settings module `{}`",
            args.settings_module
        )
    })?;
    let snapshot = registry.apps_snapshot();
    std::fs::write(&args.apps_file, format!("{}\n", snapshot.to_lines()))
        .with_context(|| format!("could not write {}", args.apps_file.display()))?;

    tracing::debug!(
        apps = snapshot.apps().len(),
        path = %args.apps_file.display(),
        "wrote installed-apps snapshot"
    );
    Ok(())
}

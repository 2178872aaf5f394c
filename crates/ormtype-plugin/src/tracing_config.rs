//! Tracing setup for the plugin and its helper binary.
//!
//! The subscriber is only initialised when `ORMTYPE_LOG` (or `RUST_LOG`) is
//! set, so there is zero overhead in normal runs. Output goes to stderr so
//! it never interferes with anything the host reads from stdout.
//!
//! ```bash
//! ORMTYPE_LOG=debug ormtype-apps --settings-module proj.settings --apps-file /tmp/apps
//! ORMTYPE_LOG="ormtype_deps=trace" ...
//! ```

use tracing_subscriber::EnvFilter;

/// Build an `EnvFilter` from `ORMTYPE_LOG`, falling back to `RUST_LOG`.
///
/// `ORMTYPE_LOG` takes precedence when both are set; values use the usual
/// `RUST_LOG` syntax (e.g. `debug`, `ormtype_store=trace`).
fn build_filter() -> EnvFilter {
    if let Ok(val) = std::env::var("ORMTYPE_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else {
        EnvFilter::from_default_env()
    }
}

/// Initialise the global tracing subscriber.
///
/// Does nothing when neither `ORMTYPE_LOG` nor `RUST_LOG` is set.
pub fn init_tracing() {
    let has_ormtype_log = std::env::var("ORMTYPE_LOG").is_ok();
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !has_ormtype_log && !has_rust_log {
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(build_filter())
        .with_writer(std::io::stderr)
        .init();
}

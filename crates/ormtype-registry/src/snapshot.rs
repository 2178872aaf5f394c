//! Installed-apps snapshot and fingerprint.
//!
//! The ordered application list fingerprints registry membership. The daemon
//! layer compares fingerprints across runs; a change means class objects and
//! cached metadata cannot be trusted and the process must restart rather
//! than patch incrementally.

use ormtype_common::hashing::stable_hash_hex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledAppsSnapshot {
    apps: Vec<String>,
}

impl InstalledAppsSnapshot {
    pub fn new(apps: Vec<String>) -> Self {
        Self { apps }
    }

    /// Parse the one-app-per-line format written by the helper script.
    pub fn from_lines(text: &str) -> Self {
        Self {
            apps: text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// The one-app-per-line format consumed by `from_lines`.
    pub fn to_lines(&self) -> String {
        self.apps.join("\n")
    }

    pub fn apps(&self) -> &[String] {
        &self.apps
    }

    /// Order-sensitive membership fingerprint.
    pub fn fingerprint(&self) -> String {
        stable_hash_hex(self.apps.join("||").as_bytes())
    }
}

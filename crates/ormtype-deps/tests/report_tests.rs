//! Report persistence and drift-detection behavior.

use std::path::Path;

use ormtype_deps::tracker::{Dep, DepTracker};
use ormtype_deps::report::ReportStore;
use ormtype_deps::MANIFEST_NAME;
use ormtype_registry::{InMemoryRegistry, ModelClass, ModelRegistry};
use ormtype_store::ChildrenStore;

const PREFIX: &str = "__ormtype_report__";
const SETTINGS: &str = "proj.settings";

fn model(fullname: &str, app: &str, is_abstract: bool, bases: &[&str]) -> ModelClass {
    ModelClass {
        fullname: fullname.to_string(),
        module: String::new(),
        app_label: app.to_string(),
        is_abstract,
        bases: bases.iter().map(|base| base.to_string()).collect(),
        related_models: Vec::new(),
        reverse_related_models: Vec::new(),
        default_manager: None,
    }
}

/// A model whose only cross-module edge is a forward relation.
fn related_model(fullname: &str, app: &str, related: &str) -> ModelClass {
    ModelClass {
        related_models: vec![related.to_string()],
        ..model(fullname, app, false, &[])
    }
}

fn registry() -> InMemoryRegistry {
    let mut registry = InMemoryRegistry::new();
    registry.set_installed_apps(vec!["shop".to_string(), "blog".to_string()]);
    registry.insert_model(model("shop.models.Parent", "shop", true, &[]));
    registry.insert_model(model(
        "shop.models.Item",
        "shop",
        false,
        &["shop.models.Parent"],
    ));
    registry.insert_model(model(
        "blog.models.Post",
        "blog",
        false,
        &["shop.models.Parent"],
    ));
    registry
}

fn marker_files(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("mod_") && name.ends_with(".dep"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_first_recompute_writes_everything_second_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();

    let first = tracker.recompute(&registry).unwrap();
    assert!(first.changed > 0, "fresh report should mark every module");
    // Manifest plus one marker per tracked module (two model modules and
    // the settings module).
    assert_eq!(first.written, 4);
    assert_eq!(marker_files(dir.path()).len(), 3);

    let second = tracker.recompute(&registry).unwrap();
    assert_eq!(
        second.changed, 0,
        "identical registry state must not dirty any summary"
    );
    assert_eq!(second.written, 0, "no file may be touched without a change");
}

#[test]
fn test_epoch_advances_only_when_a_summary_changes() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = registry();
    let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();

    tracker.recompute(&registry).unwrap();
    assert_eq!(tracker.report().epoch_of("blog.models"), 0);

    tracker.recompute(&registry).unwrap();
    assert_eq!(
        tracker.report().epoch_of("blog.models"),
        0,
        "recompute without change must not advance the epoch"
    );

    // A new relation changes blog.models' dependency set.
    registry.insert_model(related_model(
        "blog.models.Comment",
        "blog",
        "crm.models.Lead",
    ));
    tracker.recompute(&registry).unwrap();
    assert_eq!(tracker.report().epoch_of("blog.models"), 1);
}

#[test]
fn test_unrelated_markers_stay_byte_identical_across_a_change() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = registry();
    registry.insert_model(model("crm.models.Lead", "shop", false, &[]));
    let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();
    tracker.recompute(&registry).unwrap();

    let before: Vec<(String, String)> = marker_files(dir.path())
        .into_iter()
        .map(|name| {
            let content = std::fs::read_to_string(dir.path().join(&name)).unwrap();
            (name, content)
        })
        .collect();

    registry.insert_model(related_model(
        "blog.models.Comment",
        "blog",
        "crm.models.Lead",
    ));
    let outcome = tracker.recompute(&registry).unwrap();
    // blog.models' marker and the manifest; everything else untouched.
    assert_eq!(outcome.changed, 1);
    assert_eq!(outcome.written, 2);

    for (name, old_content) in before {
        let new_content = std::fs::read_to_string(dir.path().join(&name)).unwrap();
        if old_content.starts_with("blog.models ") {
            assert_ne!(new_content, old_content, "{name} should have changed");
        } else {
            assert_eq!(new_content, old_content, "{name} must be byte-identical");
        }
    }
}

#[test]
fn test_reopen_restores_summaries_and_epochs() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = registry();
    {
        let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();
        tracker.recompute(&registry).unwrap();
        registry.insert_model(related_model(
            "blog.models.Comment",
            "blog",
            "crm.models.Lead",
        ));
        tracker.recompute(&registry).unwrap();
        assert_eq!(tracker.report().epoch_of("blog.models"), 1);
    }

    let reopened = ReportStore::open(dir.path(), PREFIX).unwrap();
    assert_eq!(reopened.epoch_of("blog.models"), 1);
    assert!(reopened.summary_of("shop.models").is_some());

    let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();
    let outcome = tracker.recompute(&registry).unwrap();
    assert_eq!(
        outcome.written, 0,
        "a fresh process over unchanged state must not rewrite the report"
    );
}

#[test]
fn test_prefix_mismatch_discards_prior_state() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();
    tracker.recompute(&registry).unwrap();

    let other = ReportStore::open(dir.path(), "__other_prefix__").unwrap();
    assert_eq!(other.modules().count(), 0);
}

#[test]
fn test_corrupt_manifest_is_discarded_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(MANIFEST_NAME), "{ not json").unwrap();
    let store = ReportStore::open(dir.path(), PREFIX).unwrap();
    assert_eq!(store.modules().count(), 0);
}

#[test]
fn test_stale_markers_are_removed_with_their_modules() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = registry();
    let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();
    tracker.recompute(&registry).unwrap();
    assert_eq!(marker_files(dir.path()).len(), 3);

    registry.remove_app("blog");
    tracker.recompute(&registry).unwrap();
    assert_eq!(
        marker_files(dir.path()).len(),
        2,
        "blog.models' marker should be gone"
    );
    assert!(!tracker.report().contains("blog.models"));
}

#[test]
fn test_for_file_merges_host_deps_with_computed_and_marker_edges() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();
    tracker.recompute(&registry).unwrap();

    let host_deps = [Dep {
        priority: 5,
        module: "shop.views".to_string(),
        line: 3,
    }];
    let merged = tracker.for_file("blog.models", &host_deps);

    assert_eq!(merged[0], host_deps[0], "host deps come first, untouched");
    assert!(
        merged.contains(&Dep::computed("shop.models")),
        "cross-module inheritance edge missing: {merged:?}"
    );
    let marker = tracker.report().marker_module("blog.models");
    assert!(
        merged.contains(&Dep::computed(marker)),
        "report marker edge missing: {merged:?}"
    );
}

#[test]
fn test_for_file_on_untracked_module_returns_host_deps_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();
    tracker.recompute(&registry).unwrap();

    let merged = tracker.for_file("shop.helpers", &[]);
    assert!(merged.is_empty());
}

#[test]
fn test_drift_refresh_prunes_children_and_recomputes() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = registry();
    let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();
    tracker.recompute(&registry).unwrap();

    let mut children = ChildrenStore::new();
    children.register("shop.models.Parent", "shop.models.Item", &registry);
    children.register("shop.models.Parent", "blog.models.Post", &registry);

    // The blog application disappears; the host can no longer resolve
    // blog.models, which the tracker still knows as a model module.
    registry.remove_app("blog");
    let refreshed = tracker
        .refresh_if_unresolvable(
            &["blog.models".to_string()],
            &mut registry,
            &mut children,
        )
        .unwrap();
    assert!(refreshed, "a known model module going unresolvable is drift");

    let remaining: Vec<&str> = children
        .record("shop.models.Parent")
        .unwrap()
        .children()
        .collect();
    assert_eq!(remaining, ["shop.models.Item"]);
    assert!(!tracker.is_known_module("blog.models"));
}

#[test]
fn test_unresolvable_non_model_module_is_not_drift() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = registry();
    let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();
    tracker.recompute(&registry).unwrap();

    let mut children = ChildrenStore::new();
    let refreshed = tracker
        .refresh_if_unresolvable(
            &["some.random.module".to_string()],
            &mut registry,
            &mut children,
        )
        .unwrap();
    assert!(!refreshed);
}

#[test]
fn test_version_fingerprint_changes_with_apps_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = registry();
    let mut tracker = DepTracker::open(dir.path(), PREFIX, SETTINGS).unwrap();
    tracker.recompute(&registry).unwrap();

    let original = tracker
        .version_fingerprint(&registry.apps_snapshot())
        .unwrap();
    let repeat = tracker
        .version_fingerprint(&registry.apps_snapshot())
        .unwrap();
    assert_eq!(original, repeat, "fingerprint must be stable at rest");

    registry.remove_app("blog");
    tracker.recompute(&registry).unwrap();
    let after = tracker
        .version_fingerprint(&registry.apps_snapshot())
        .unwrap();
    assert_ne!(
        original, after,
        "an app-list change must change the fingerprint"
    );
}

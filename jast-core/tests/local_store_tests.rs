//! Local mirror error messages, atomic-write safety, and path classification.

use std::path::Path;

use assert_fs::prelude::*;
use jast_core::{
    local::{self, ScriptLayout, TrackedPath},
    LocalStateError, ScriptId, ScriptMetadata, ScriptName,
};
use predicates::prelude::*;
use rstest::rstest;

fn layout(root: &Path) -> ScriptLayout {
    ScriptLayout::new(root, "scripts", "scripts/metadata", "sh")
}

fn name() -> ScriptName {
    ScriptName::from("check-disk")
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn corrupt_descriptor_reports_path() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("scripts/metadata/check-disk.toml")
        .write_str("priority = [unclosed")
        .expect("write");

    let err = local::load_metadata(&layout(root.path()), &name()).unwrap_err();
    assert!(matches!(err, LocalStateError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("check-disk.toml"));
}

#[test]
fn wrong_type_descriptor_is_a_parse_error() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("scripts/metadata/check-disk.toml")
        .write_str("id = \"not-a-number\"\n")
        .expect("write");

    let err = local::load_metadata(&layout(root.path()), &name()).unwrap_err();
    assert!(matches!(err, LocalStateError::Parse { .. }), "got: {err}");
}

#[test]
fn missing_body_is_not_found() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let layout = layout(root.path());
    local::save_metadata(&layout, &name(), &ScriptMetadata::default()).expect("save");

    let err = local::load_script(&layout, &name()).unwrap_err();
    assert!(matches!(err, LocalStateError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("check-disk.sh"));
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn persisting_an_id_rewrites_only_the_descriptor() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let layout = layout(root.path());
    local::create_new(&layout, &name(), ScriptMetadata::default()).expect("create");

    let mut meta = local::load_metadata(&layout, &name()).expect("load");
    meta.id = Some(ScriptId(101));
    local::save_metadata(&layout, &name(), &meta).expect("save");

    root.child("scripts/metadata/check-disk.toml")
        .assert(predicate::str::contains("id = 101"));
    root.child("scripts/metadata/check-disk.toml.tmp")
        .assert(predicate::path::missing());
    root.child("scripts/check-disk.sh")
        .assert(predicate::str::starts_with("#!/bin/bash"));
}

#[cfg(unix)]
#[test]
fn failed_save_leaves_original_descriptor() {
    use std::os::unix::fs::PermissionsExt;

    let root = assert_fs::TempDir::new().expect("tempdir");
    let layout = layout(root.path());
    local::save_metadata(&layout, &name(), &ScriptMetadata::default()).expect("save");

    let dir = layout.metadata_dir();
    std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o555)).expect("chmod");

    let meta = ScriptMetadata {
        id: Some(ScriptId(9)),
        ..ScriptMetadata::default()
    };
    let result = local::save_metadata(&layout, &name(), &meta);

    std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755)).expect("chmod back");

    // Running as root bypasses directory permissions; only assert when the
    // write was actually refused.
    if result.is_err() {
        let loaded = local::load_metadata(&layout, &name()).expect("load");
        assert_eq!(loaded.id, None, "original descriptor must be intact");
    }
}

// ---------------------------------------------------------------------------
// 3. Path classification
// ---------------------------------------------------------------------------

#[rstest]
#[case("scripts/check-disk.sh", Some(TrackedPath::Script(ScriptName::from("check-disk"))))]
#[case("scripts/metadata/check-disk.toml", Some(TrackedPath::Metadata(ScriptName::from("check-disk"))))]
#[case("scripts/check-disk.py", None)]
#[case("scripts/metadata/check-disk.sh", None)]
#[case("check-disk.sh", None)]
#[case("docs/scripts/check-disk.sh", None)]
#[case("scripts/.sh", None)]
fn classify_cases(#[case] path: &str, #[case] expected: Option<TrackedPath>) {
    let layout = ScriptLayout::new("/repo", "scripts", "scripts/metadata", "sh");
    assert_eq!(layout.classify(Path::new(path)), expected);
}

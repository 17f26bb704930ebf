use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use predicates::str::contains;

fn jast(config: &Path, cwd: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("jast"));
    cmd.env("JAST_CONFIG", config)
        .env_remove("JAST_JAMF__URL")
        .env_remove("JAST_JAMF__USER")
        .env_remove("JAST_JAMF__PASSWORD")
        .env("NO_COLOR", "1")
        .current_dir(cwd);
    cmd
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
        .args(args)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("spawn git");
    assert!(status.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&status.stderr));
}

/// Work tree with `main` pushed to a bare remote.
fn pushed_repo(tmp: &TempDir) -> std::path::PathBuf {
    let remote = tmp.path().join("remote.git");
    let work = tmp.child("work");
    work.create_dir_all().expect("mkdir work");
    work.child("README.md").write_str("scripts\n").expect("readme");
    git(tmp.path(), &["init", "-q", "--bare", remote.to_str().expect("utf8")]);
    git(work.path(), &["init", "-q", "-b", "main"]);
    git(work.path(), &["add", "-A"]);
    git(work.path(), &["commit", "-q", "-m", "Initial"]);
    git(work.path(), &["remote", "add", "origin", remote.to_str().expect("utf8")]);
    git(work.path(), &["push", "-q", "-u", "origin", "main"]);
    work.path().to_path_buf()
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_path_honours_env_override() {
    let tmp = TempDir::new().expect("tempdir");
    let config = tmp.child("custom.toml");
    jast(config.path(), tmp.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(contains("custom.toml"));
}

#[test]
fn config_init_writes_defaults_once() {
    let tmp = TempDir::new().expect("tempdir");
    let config = tmp.child("jast/config.toml");

    jast(config.path(), tmp.path())
        .args(["config", "init"])
        .assert()
        .success();
    config.assert(predicate::str::contains("[jamf]"));
    config.assert(predicate::str::contains("history_policy = \"best-effort\""));

    jast(config.path(), tmp.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(contains("already exists"));
    jast(config.path(), tmp.path())
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn config_show_masks_password() {
    let tmp = TempDir::new().expect("tempdir");
    let config = tmp.child("config.toml");
    config
        .write_str("[jamf]\nurl = \"https://example.jamfcloud.com\"\nuser = \"api\"\npassword = \"hunter2\"\n")
        .expect("config");

    jast(config.path(), tmp.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("https://example.jamfcloud.com"))
        .stdout(contains("********"))
        .stdout(contains("hunter2").not());
}

#[test]
fn malformed_env_override_is_a_configuration_error() {
    let tmp = TempDir::new().expect("tempdir");
    jast(&tmp.path().join("none.toml"), tmp.path())
        .env("JAST_JAMF__TIMEOUT_SECS", "soon")
        .args(["config", "show"])
        .assert()
        .code(78);
}

// ---------------------------------------------------------------------------
// scripts
// ---------------------------------------------------------------------------

#[test]
fn scripts_new_scaffolds_body_and_descriptor() {
    let tmp = TempDir::new().expect("tempdir");
    let config = tmp.child("config.toml");
    config.write_str("[scripts]\npath = \"scripts\"\n").expect("config");

    jast(config.path(), tmp.path())
        .args(["scripts", "new", "--name", "check-disk", "--info", "Reports disk usage", "--priority", "before"])
        .assert()
        .success()
        .stdout(contains("Created 'check-disk'"));

    tmp.child("scripts/check-disk.sh").assert("#!/bin/bash\n\n");
    tmp.child("scripts/metadata/check-disk.toml")
        .assert(predicate::str::contains("info = \"Reports disk usage\"").and(predicate::str::contains("BEFORE")));

    jast(config.path(), tmp.path())
        .args(["scripts", "new", "--name", "check-disk"])
        .assert()
        .code(74)
        .stderr(contains("already exists"));
}

#[test]
fn push_without_credentials_exits_with_configuration_code() {
    let tmp = TempDir::new().expect("tempdir");
    jast(&tmp.path().join("none.toml"), tmp.path())
        .args(["scripts", "push", "--dry-run"])
        .assert()
        .code(78)
        .stderr(contains("missing credential"));
}

#[test]
fn unreachable_server_exits_with_remote_code() {
    let tmp = TempDir::new().expect("tempdir");
    let config = tmp.child("config.toml");
    config
        .write_str("[jamf]\nurl = \"http://127.0.0.1:1\"\nuser = \"api\"\npassword = \"x\"\ntimeout_secs = 2\n")
        .expect("config");

    jast(config.path(), tmp.path())
        .args(["scripts", "status"])
        .assert()
        .code(69);
}

// ---------------------------------------------------------------------------
// hook
// ---------------------------------------------------------------------------

#[test]
fn hook_install_is_idempotent() {
    let tmp = TempDir::new().expect("tempdir");
    let config = tmp.child("config.toml");

    jast(config.path(), tmp.path())
        .args(["hook", "install"])
        .assert()
        .success()
        .stdout(contains("Added 'jast-pre-push'"));
    jast(config.path(), tmp.path())
        .args(["hook", "install"])
        .assert()
        .success()
        .stdout(contains("already configured"));

    let text = fs::read_to_string(tmp.path().join(".pre-commit-config.yaml")).expect("read");
    assert_eq!(text.matches("jast-pre-push").count(), 1);
    assert!(text.contains("entry: jast hook pre-push"));
}

#[test]
fn pre_push_with_nothing_pending_needs_no_server() {
    let tmp = TempDir::new().expect("tempdir");
    let work = pushed_repo(&tmp);

    jast(&tmp.path().join("none.toml"), &work)
        .args(["hook", "pre-push", "origin", "/tmp/remote.git"])
        .assert()
        .success()
        .stdout(contains("no unpushed commits"));
}

#[test]
fn pre_push_on_branch_without_upstream_blocks_push() {
    let tmp = TempDir::new().expect("tempdir");
    let work = pushed_repo(&tmp);
    git(&work, &["checkout", "-q", "-b", "topic"]);

    jast(&tmp.path().join("none.toml"), &work)
        .args(["hook", "pre-push"])
        .assert()
        .code(78)
        .stderr(contains("no remote tracking reference"));
}

#[test]
fn pre_push_with_pending_commit_and_no_server_blocks_push() {
    let tmp = TempDir::new().expect("tempdir");
    let work = pushed_repo(&tmp);
    fs::write(work.join("check.sh"), "echo hi\n").expect("script");
    git(&work, &["add", "-A"]);
    git(&work, &["commit", "-q", "-m", "Add check"]);

    jast(&tmp.path().join("none.toml"), &work)
        .args(["hook", "pre-push", "--dry-run"])
        .assert()
        .code(78);
}

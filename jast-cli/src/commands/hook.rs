//! `jast hook pre-push` and `jast hook install`.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_yaml::{Mapping, Value};

use jast_sync::{range, run_push_hook, HookContext, SyncError};

use super::push::print_report;
use crate::context::Session;

/// Hook id written into `.pre-commit-config.yaml`.
pub const HOOK_ID: &str = "jast-pre-push";
const PRE_COMMIT_CONFIG: &str = ".pre-commit-config.yaml";

#[derive(Subcommand, Debug)]
pub enum HookCommand {
    /// Replay unpushed commits against the server; a failure blocks the push.
    PrePush(PrePushArgs),
    /// Register the pre-push hook in `.pre-commit-config.yaml`.
    Install,
}

#[derive(Args, Debug)]
pub struct PrePushArgs {
    /// Deactivate deleted scripts instead of destroying them.
    #[arg(long)]
    pub soft_delete: bool,

    /// Report what would be pushed without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Remote name and URL passed by git; unused.
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub git_args: Vec<String>,
}

pub fn run(command: HookCommand) -> Result<()> {
    match command {
        HookCommand::PrePush(args) => pre_push(args),
        HookCommand::Install => install(),
    }
}

fn pre_push(args: PrePushArgs) -> Result<()> {
    let session = Session::open()?;
    let repo = session.repo();

    // No server round trip when there is nothing to replay.
    let pending = range::resolve(&repo)?;
    if pending.is_empty() {
        println!("✓ no unpushed commits on '{}'", pending.branch);
        return Ok(());
    }

    let ctx = HookContext::from_config(&session.config, &session.root, args.soft_delete, args.dry_run);
    let client = session.connect()?;
    let report = run_push_hook(&ctx, &client, &repo).map_err(|err: SyncError| {
        tracing::error!(exit_code = err.exit_code(), "push to server failed; blocking git push");
        err
    })?;
    print_report(&report);
    Ok(())
}

fn install() -> Result<()> {
    let session = Session::open()?;
    let path = session.root.join(PRE_COMMIT_CONFIG);
    if install_at(&path)? {
        println!("✓ Added '{HOOK_ID}' to {}", path.display());
        println!("Run 'pre-commit install --hook-type pre-push' to activate it.");
    } else {
        println!("'{HOOK_ID}' is already configured in {}", path.display());
    }
    Ok(())
}

/// Add the hook entry to the pre-commit config at `path`, creating the file
/// if needed. Returns `false` when the entry was already present.
pub fn install_at(path: &Path) -> Result<bool> {
    let mut doc = match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => serde_yaml::from_str::<Value>(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?,
        Ok(_) => Value::Mapping(Mapping::new()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Value::Mapping(Mapping::new()),
        Err(err) => return Err(err).with_context(|| format!("failed to read {}", path.display())),
    };

    if !add_hook_entry(&mut doc)? {
        return Ok(false);
    }

    let text = serde_yaml::to_string(&doc).context("failed to serialize pre-commit config")?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, text).with_context(|| format!("failed to write {}", tmp.display()))?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("failed to replace {}", path.display()));
    }
    Ok(true)
}

fn add_hook_entry(doc: &mut Value) -> Result<bool> {
    let Value::Mapping(root) = doc else {
        anyhow::bail!("pre-commit config is not a mapping");
    };
    let repos = root
        .entry(Value::from("repos"))
        .or_insert_with(|| Value::Sequence(Vec::new()));
    let Value::Sequence(repos) = repos else {
        anyhow::bail!("`repos` in pre-commit config is not a list");
    };

    let present = repos.iter().any(|repo| {
        repo.get("hooks")
            .and_then(Value::as_sequence)
            .is_some_and(|hooks| hooks.iter().any(|h| h.get("id").and_then(Value::as_str) == Some(HOOK_ID)))
    });
    if present {
        return Ok(false);
    }

    repos.push(serde_yaml::from_str(&format!(
        "repo: local\n\
         hooks:\n\
         - id: {HOOK_ID}\n  \
           name: push script changes to Jamf Pro\n  \
           entry: jast hook pre-push\n  \
           language: system\n  \
           stages: [pre-push]\n  \
           pass_filenames: false\n  \
           always_run: true\n"
    ))?);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_config_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join(PRE_COMMIT_CONFIG);
        assert!(install_at(&path).expect("install"));

        let doc: Value = serde_yaml::from_str(&std::fs::read_to_string(&path).expect("read")).expect("yaml");
        let hook = &doc["repos"][0]["hooks"][0];
        assert_eq!(doc["repos"][0]["repo"].as_str(), Some("local"));
        assert_eq!(hook["id"].as_str(), Some(HOOK_ID));
        assert_eq!(hook["entry"].as_str(), Some("jast hook pre-push"));
        assert_eq!(hook["stages"][0].as_str(), Some("pre-push"));
        assert_eq!(hook["pass_filenames"].as_bool(), Some(false));
    }

    #[test]
    fn keeps_existing_repos_and_is_idempotent() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join(PRE_COMMIT_CONFIG);
        std::fs::write(
            &path,
            "repos:\n- repo: https://github.com/pre-commit/pre-commit-hooks\n  rev: v4.5.0\n  hooks:\n  - id: trailing-whitespace\n",
        )
        .expect("seed");

        assert!(install_at(&path).expect("first"));
        assert!(!install_at(&path).expect("second"));

        let doc: Value = serde_yaml::from_str(&std::fs::read_to_string(&path).expect("read")).expect("yaml");
        let repos = doc["repos"].as_sequence().expect("list");
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0]["hooks"][0]["id"].as_str(), Some("trailing-whitespace"));
    }

    #[test]
    fn rejects_non_mapping_document() {
        let mut doc = Value::Sequence(Vec::new());
        assert!(add_hook_entry(&mut doc).is_err());
    }
}

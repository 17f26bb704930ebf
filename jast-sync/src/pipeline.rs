//! Shared push entry points used by the CLI and the pre-push hook.

use std::path::{Path, PathBuf};

use jast_core::{Config, HistoryPolicy, ScriptId, ScriptLayout, ScriptName, TrackedPath};
use jast_core::local;
use jast_git::VersionControl;
use jast_remote::RemoteStore;

use crate::classify::plan;
use crate::error::SyncError;
use crate::history::{ledger_path, HistoryNotePublisher};
use crate::orchestrator::{names_for_ids, push_scripts, PushOptions, PushReport, SyncOrchestrator};
use crate::range;

/// Everything a hook run needs besides the two external seams.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub layout: ScriptLayout,
    pub options: PushOptions,
    pub history_policy: HistoryPolicy,
}

impl HookContext {
    pub fn from_config(config: &Config, repo_root: &Path, soft_delete: bool, dry_run: bool) -> Self {
        Self {
            layout: config.layout(repo_root),
            options: PushOptions::from_config(config, soft_delete, dry_run),
            history_policy: config.sync.history_policy,
        }
    }
}

/// Push every unpushed commit on the current branch.
///
/// Resolves the commit range, classifies all of it, then applies it in order.
/// Nothing is sent when the range is empty or classification fails.
pub fn run_push_hook<S, V>(ctx: &HookContext, store: &S, vcs: &V) -> Result<PushReport, SyncError>
where
    S: RemoteStore + ?Sized,
    V: VersionControl + ?Sized,
{
    let range = range::resolve(vcs)?;
    if range.is_empty() {
        tracing::info!(branch = %range.branch, "nothing to push");
        return Ok(PushReport {
            dry_run: ctx.options.dry_run,
            ..PushReport::default()
        });
    }

    let planned = plan(vcs, &ctx.layout, &range.commits)?;
    let mut publisher = if ctx.options.dry_run {
        HistoryNotePublisher::in_memory(ctx.history_policy)
    } else {
        HistoryNotePublisher::open(ledger_path(&vcs.git_dir()?), ctx.history_policy)?
    };

    SyncOrchestrator::new(store, vcs, &ctx.layout, ctx.options).push(&planned, &mut publisher)
}

/// Scope of an explicit `scripts push`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushScope {
    /// Every script with a local descriptor.
    All,
    /// Scripts already known remotely, by id.
    Ids(Vec<ScriptId>),
    /// Script bodies or descriptors, by path.
    Files(Vec<PathBuf>),
}

/// Push working-copy scripts selected by `scope`, outside any commit range.
pub fn run_push<S: RemoteStore + ?Sized>(
    layout: &ScriptLayout,
    store: &S,
    scope: PushScope,
    dry_run: bool,
) -> Result<PushReport, SyncError> {
    let names = match scope {
        PushScope::All => local::list_names(layout)?,
        PushScope::Ids(ids) => {
            let names = names_for_ids(layout, &ids)?;
            for (id, name) in ids.iter().zip(&names) {
                let remote = store.get(*id)?;
                if remote.name != name.as_str() {
                    tracing::warn!(%id, remote = %remote.name, local = %name, "remote name differs; local name will be pushed");
                }
            }
            names
        }
        PushScope::Files(paths) => paths
            .iter()
            .map(|path| name_for_path(layout, path))
            .collect::<Result<_, _>>()?,
    };
    push_scripts(store, layout, &names, dry_run)
}

/// Script name for a body or descriptor path, absolute or root-relative.
pub fn name_for_path(layout: &ScriptLayout, path: &Path) -> Result<ScriptName, SyncError> {
    let relative = path.strip_prefix(layout.root()).unwrap_or(path);
    match layout.classify(relative) {
        Some(TrackedPath::Script(name) | TrackedPath::Metadata(name)) => Ok(name),
        None => Err(SyncError::Configuration(format!(
            "{} is not a script or descriptor under {}",
            path.display(),
            layout.scripts_dir().display()
        ))),
    }
}

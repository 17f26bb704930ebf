//! Per-commit change classification.
//!
//! Reads only the commit's tree diff, never the working copy, so the same
//! commit always yields the same changes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use jast_core::{ScriptLayout, ScriptName, TrackedPath};
use jast_git::{Commit, CommitId, FileStatus, VersionControl};

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Upsert,
    Delete,
}

/// Which tracked file produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    Body,
    /// Only the descriptor changed; the body may not exist in the tree.
    Metadata,
}

/// One script-level operation derived from a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Repository-relative body path.
    pub path: PathBuf,
    pub name: ScriptName,
    pub kind: ChangeKind,
    pub source: ChangeSource,
}

/// A commit together with the changes it will apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommit {
    pub commit: Commit,
    pub changes: Vec<Change>,
}

/// Classify raw diff entries of `commit`.
///
/// Paths outside the script layout are ignored. For tracked paths `A`, `M`
/// and `T` are upserts and `D` is a delete; any other letter fails the whole
/// commit. A descriptor add or modify becomes an upsert of its script unless
/// the body itself has an entry, and a descriptor delete on its own is a
/// no-op. The result holds at most one change per script, sorted by path.
pub fn classify_statuses(
    layout: &ScriptLayout,
    commit: &CommitId,
    statuses: &[FileStatus],
) -> Result<Vec<Change>, SyncError> {
    let mut changes: BTreeMap<PathBuf, Change> = BTreeMap::new();

    for entry in statuses {
        let Some(tracked) = layout.classify(&entry.path) else {
            continue;
        };
        let kind = match entry.status {
            'A' | 'M' | 'T' => ChangeKind::Upsert,
            'D' => ChangeKind::Delete,
            other => {
                return Err(SyncError::Classification {
                    commit: commit.short().to_string(),
                    path: entry.path.clone(),
                    status: other,
                })
            }
        };

        match tracked {
            TrackedPath::Script(name) => {
                let path = layout.relative_script_path(&name);
                changes.insert(
                    path.clone(),
                    Change {
                        path,
                        name,
                        kind,
                        source: ChangeSource::Body,
                    },
                );
            }
            TrackedPath::Metadata(name) if kind == ChangeKind::Upsert => {
                let path = layout.relative_script_path(&name);
                changes.entry(path.clone()).or_insert(Change {
                    path,
                    name,
                    kind,
                    source: ChangeSource::Metadata,
                });
            }
            TrackedPath::Metadata(name) => {
                tracing::debug!(%name, "descriptor removed without its body; nothing to push");
            }
        }
    }

    Ok(changes.into_values().collect())
}

pub fn classify_commit<V: VersionControl + ?Sized>(
    vcs: &V,
    layout: &ScriptLayout,
    commit: &Commit,
) -> Result<Vec<Change>, SyncError> {
    let statuses = vcs.diff_status(&commit.id)?;
    classify_statuses(layout, &commit.id, &statuses)
}

/// Classify every commit before anything is applied, so an unsupported
/// change anywhere in the range stops the push with no remote calls made.
pub fn plan<V: VersionControl + ?Sized>(
    vcs: &V,
    layout: &ScriptLayout,
    commits: &[Commit],
) -> Result<Vec<PlannedCommit>, SyncError> {
    commits
        .iter()
        .map(|commit| {
            let changes = classify_commit(vcs, layout, commit)?;
            tracing::debug!(commit = %commit.id.short(), changes = changes.len(), "classified");
            Ok(PlannedCommit {
                commit: commit.clone(),
                changes,
            })
        })
        .collect()
}

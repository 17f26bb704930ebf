//! Unpushed commit range of the current branch.

use jast_git::{Commit, VersionControl};

use crate::error::SyncError;

/// Commits on `branch` not yet on `upstream`, oldest first, merges excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    pub branch: String,
    pub upstream: String,
    pub commits: Vec<Commit>,
}

impl CommitRange {
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

/// Resolve the range between the branch tip and its tracking reference.
///
/// Fails with [`SyncError::Configuration`] on a detached HEAD or when the
/// branch has never been pushed; an initial full push or pull has to happen
/// before hook-driven sync can work.
pub fn resolve<V: VersionControl + ?Sized>(vcs: &V) -> Result<CommitRange, SyncError> {
    let branch = vcs.current_branch()?.ok_or_else(|| {
        SyncError::Configuration("HEAD is detached; check out a branch before pushing".to_string())
    })?;
    let upstream = vcs.tracking_ref(&branch)?.ok_or_else(|| {
        SyncError::Configuration(format!(
            "branch '{branch}' has no remote tracking reference; push it once with --set-upstream"
        ))
    })?;

    let mut commits = Vec::new();
    for id in vcs.commit_range(&upstream, "HEAD")? {
        let commit = vcs.commit(&id)?;
        if commit.parent_count() != 1 {
            tracing::debug!(commit = %commit.id.short(), "skipping non-linear commit");
            continue;
        }
        commits.push(commit);
    }

    tracing::info!(
        %branch,
        %upstream,
        count = commits.len(),
        "resolved unpushed commits"
    );
    Ok(CommitRange {
        branch,
        upstream,
        commits,
    })
}

//! Version-control queries for `jast`.
//!
//! [`VersionControl`] is the narrow read-only view of the repository the sync
//! engine needs: which branch is checked out, what it tracks, which commits
//! are unpushed, and what each of those commits changed. [`Git`] answers those
//! questions by running the `git` binary.

use std::fmt;
use std::path::{Path, PathBuf};

mod git;

pub use git::Git;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Full object name of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(pub String);

impl CommitId {
    /// Abbreviated form used in history notes and log lines.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(7)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CommitId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A commit as seen by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: CommitId,
    /// Full message with trailing whitespace removed.
    pub message: String,
    pub parents: Vec<CommitId>,
}

impl Commit {
    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    /// The only parent of a non-merge, non-root commit.
    pub fn single_parent(&self) -> Option<&CommitId> {
        match self.parents.as_slice() {
            [parent] => Some(parent),
            _ => None,
        }
    }

    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// One entry of a commit's tree diff against its parent.
///
/// `status` is the raw letter git reports (`A`, `M`, `D`, `T`, ...). Deciding
/// which letters are supported is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub status: char,
    /// Repository-relative path.
    pub path: PathBuf,
}

/// Errors from querying the repository.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` binary could not be started.
    #[error("failed to run git: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    /// git ran and exited non-zero.
    #[error("`git {args}` failed: {stderr}")]
    Command { args: String, stderr: String },

    /// git's output was not in the expected shape.
    #[error("unexpected output from `git {args}`: {message}")]
    Parse { args: String, message: String },
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Read-only repository queries.
pub trait VersionControl {
    /// Short name of the checked-out branch; `None` on a detached HEAD.
    fn current_branch(&self) -> Result<Option<String>, GitError>;

    /// Upstream of `branch` (e.g. `origin/main`); `None` when it has none.
    fn tracking_ref(&self, branch: &str) -> Result<Option<String>, GitError>;

    /// Single-parent commits reachable from `tip` but not from `base`,
    /// oldest first.
    fn commit_range(&self, base: &str, tip: &str) -> Result<Vec<CommitId>, GitError>;

    fn commit(&self, id: &CommitId) -> Result<Commit, GitError>;

    /// Tree diff of `id` against its first parent. Renames are reported as a
    /// delete plus an add.
    fn diff_status(&self, id: &CommitId) -> Result<Vec<FileStatus>, GitError>;

    /// Content of `path` in the tree of `rev`; `None` when the path is absent.
    fn show_file(&self, rev: &CommitId, path: &Path) -> Result<Option<String>, GitError>;

    /// Absolute path of the repository's git directory.
    fn git_dir(&self) -> Result<PathBuf, GitError>;
}

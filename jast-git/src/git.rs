//! [`VersionControl`] over the `git` binary.

use std::path::{Component, Path, PathBuf};
use std::process::{Command, Output};

use crate::{Commit, CommitId, FileStatus, GitError, VersionControl};

/// A working tree driven through `git -C <root>`.
#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
}

impl Git {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Repository containing `start`, rooted at its top-level directory.
    pub fn discover(start: &Path) -> Result<Self, GitError> {
        let probe = Self::open(start);
        let top = probe.run_text(&["rev-parse", "--show-toplevel"])?;
        Ok(Self::open(top.trim_end()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // -----------------------------------------------------------------------
    // Process plumbing
    // -----------------------------------------------------------------------

    fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        tracing::debug!(args = %args.join(" "), "git");
        Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .map_err(|source| GitError::Spawn { source })
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, GitError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(GitError::Command {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    fn run_text(&self, args: &[&str]) -> Result<String, GitError> {
        let bytes = self.run(args)?;
        String::from_utf8(bytes).map_err(|e| parse_error(args, e))
    }

    /// Like [`Git::run_text`], but a non-zero exit means "no answer".
    fn probe(&self, args: &[&str]) -> Result<Option<String>, GitError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Ok(None);
        }
        let text = String::from_utf8(output.stdout).map_err(|e| parse_error(args, e))?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

impl VersionControl for Git {
    fn current_branch(&self) -> Result<Option<String>, GitError> {
        self.probe(&["symbolic-ref", "--quiet", "--short", "HEAD"])
    }

    fn tracking_ref(&self, branch: &str) -> Result<Option<String>, GitError> {
        let upstream = format!("{branch}@{{upstream}}");
        self.probe(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", &upstream])
    }

    fn commit_range(&self, base: &str, tip: &str) -> Result<Vec<CommitId>, GitError> {
        let range = format!("{base}..{tip}");
        let text = self.run_text(&[
            "rev-list",
            "--reverse",
            "--topo-order",
            "--min-parents=1",
            "--max-parents=1",
            &range,
        ])?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(CommitId::from)
            .collect())
    }

    fn commit(&self, id: &CommitId) -> Result<Commit, GitError> {
        let args = ["show", "-s", "--format=%H%x00%P%x00%B", id.as_str()];
        let text = self.run_text(&args)?;
        parse_commit(&text).ok_or_else(|| GitError::Parse {
            args: args.join(" "),
            message: "expected <hash>\\0<parents>\\0<message>".to_string(),
        })
    }

    fn diff_status(&self, id: &CommitId) -> Result<Vec<FileStatus>, GitError> {
        let args = [
            "diff-tree",
            "-r",
            "-z",
            "--root",
            "--no-commit-id",
            "--name-status",
            "--no-renames",
            id.as_str(),
        ];
        let raw = self.run(&args)?;
        parse_name_status(&raw).map_err(|message| GitError::Parse {
            args: args.join(" "),
            message,
        })
    }

    fn show_file(&self, rev: &CommitId, path: &Path) -> Result<Option<String>, GitError> {
        let path = tree_path(path);
        // ls-tree fails on a bad revision but prints nothing for a missing path.
        let listing = self.run(&["ls-tree", "-z", rev.as_str(), "--", &path])?;
        if listing.is_empty() {
            return Ok(None);
        }
        let object = format!("{rev}:{path}");
        self.run_text(&["cat-file", "blob", &object]).map(Some)
    }

    fn git_dir(&self) -> Result<PathBuf, GitError> {
        let text = self.run_text(&["rev-parse", "--absolute-git-dir"])?;
        Ok(PathBuf::from(text.trim_end()))
    }
}

// ---------------------------------------------------------------------------
// Output parsers
// ---------------------------------------------------------------------------

fn parse_commit(text: &str) -> Option<Commit> {
    let mut fields = text.splitn(3, '\0');
    let id = fields.next()?.trim();
    let parents = fields.next()?;
    let message = fields.next()?;
    if id.is_empty() {
        return None;
    }
    Some(Commit {
        id: CommitId::from(id),
        message: message.trim_end().to_string(),
        parents: parents.split_whitespace().map(CommitId::from).collect(),
    })
}

/// Parse `--name-status -z` output: `<status>\0<path>\0` repeated.
fn parse_name_status(raw: &[u8]) -> Result<Vec<FileStatus>, String> {
    let text = std::str::from_utf8(raw).map_err(|e| e.to_string())?;
    let mut fields = text.split('\0').filter(|f| !f.is_empty());
    let mut entries = Vec::new();
    while let Some(status) = fields.next() {
        let letter = status
            .chars()
            .next()
            .ok_or_else(|| "empty status field".to_string())?;
        let path = fields
            .next()
            .ok_or_else(|| format!("status '{status}' without a path"))?;
        entries.push(FileStatus {
            status: letter,
            path: PathBuf::from(path),
        });
    }
    Ok(entries)
}

/// Repository-relative path in the `/`-separated form git expects.
fn tree_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn parse_error(args: &[&str], err: impl std::fmt::Display) -> GitError {
    GitError::Parse {
        args: args.join(" "),
        message: err.to_string(),
    }
}

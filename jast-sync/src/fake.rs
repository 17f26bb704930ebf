//! In-memory [`VersionControl`] for unit tests.
//!
//! Each commit stores a full tree snapshot derived from its parent plus the
//! listed changes, so `show_file` behaves like the real thing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use jast_git::{Commit, CommitId, FileStatus, GitError, VersionControl};

type Tree = BTreeMap<PathBuf, String>;

#[derive(Debug, Default)]
pub struct FakeVcs {
    pub branch: Option<String>,
    pub upstream: Option<String>,
    pub git_dir: PathBuf,
    commits: Vec<Commit>,
    statuses: BTreeMap<CommitId, Vec<FileStatus>>,
    trees: BTreeMap<CommitId, Tree>,
}

impl FakeVcs {
    /// Repo on `main` tracking `origin/main` with a pushed root commit `base`.
    pub fn new(git_dir: &Path) -> Self {
        let mut vcs = Self {
            branch: Some("main".to_string()),
            upstream: Some("origin/main".to_string()),
            git_dir: git_dir.to_path_buf(),
            ..Self::default()
        };
        vcs.trees.insert(CommitId::from("base"), Tree::new());
        vcs
    }

    /// Seed a file into the pushed base tree.
    pub fn base_file(&mut self, path: &str, content: &str) -> &mut Self {
        self.trees
            .entry(CommitId::from("base"))
            .or_default()
            .insert(PathBuf::from(path), content.to_string());
        self
    }

    /// Append a single-parent commit on top of the previous one.
    ///
    /// `changes` entries are `(status, path, content)`; content is ignored
    /// for `D`.
    pub fn add_commit(&mut self, id: &str, message: &str, changes: &[(char, &str, &str)]) -> Commit {
        let parent = self
            .commits
            .last()
            .map(|c| c.id.clone())
            .unwrap_or_else(|| CommitId::from("base"));
        let mut tree = self.trees.get(&parent).cloned().unwrap_or_default();
        let mut statuses = Vec::new();
        for (status, path, content) in changes {
            let path = PathBuf::from(path);
            match status {
                'D' => {
                    tree.remove(&path);
                }
                _ => {
                    tree.insert(path.clone(), content.to_string());
                }
            }
            statuses.push(FileStatus {
                status: *status,
                path,
            });
        }

        let commit = Commit {
            id: CommitId::from(id),
            message: message.to_string(),
            parents: vec![parent],
        };
        self.trees.insert(commit.id.clone(), tree);
        self.statuses.insert(commit.id.clone(), statuses);
        self.commits.push(commit.clone());
        commit
    }

    /// Append a merge commit; it never appears in `commit_range`.
    pub fn add_merge(&mut self, id: &str) -> Commit {
        let parent = self
            .commits
            .last()
            .map(|c| c.id.clone())
            .unwrap_or_else(|| CommitId::from("base"));
        let tree = self.trees.get(&parent).cloned().unwrap_or_default();
        let commit = Commit {
            id: CommitId::from(id),
            message: "Merge".to_string(),
            parents: vec![parent, CommitId::from("side")],
        };
        self.trees.insert(commit.id.clone(), tree);
        self.commits.push(commit.clone());
        commit
    }

    fn missing(id: &CommitId) -> GitError {
        GitError::Command {
            args: format!("show {id}"),
            stderr: "unknown revision".to_string(),
        }
    }
}

impl VersionControl for FakeVcs {
    fn current_branch(&self) -> Result<Option<String>, GitError> {
        Ok(self.branch.clone())
    }

    fn tracking_ref(&self, _branch: &str) -> Result<Option<String>, GitError> {
        Ok(self.upstream.clone())
    }

    fn commit_range(&self, _base: &str, _tip: &str) -> Result<Vec<CommitId>, GitError> {
        Ok(self
            .commits
            .iter()
            .filter(|c| c.parent_count() == 1)
            .map(|c| c.id.clone())
            .collect())
    }

    fn commit(&self, id: &CommitId) -> Result<Commit, GitError> {
        self.commits
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| Self::missing(id))
    }

    fn diff_status(&self, id: &CommitId) -> Result<Vec<FileStatus>, GitError> {
        Ok(self.statuses.get(id).cloned().unwrap_or_default())
    }

    fn show_file(&self, rev: &CommitId, path: &Path) -> Result<Option<String>, GitError> {
        let tree = self.trees.get(rev).ok_or_else(|| Self::missing(rev))?;
        Ok(tree.get(path).cloned())
    }

    fn git_dir(&self) -> Result<PathBuf, GitError> {
        Ok(self.git_dir.clone())
    }
}

//! Error types for jast-sync.

use std::path::PathBuf;

use thiserror::Error;

use jast_core::{ConfigError, LocalStateError, ScriptId};
use jast_git::GitError;
use jast_remote::RemoteError;

/// Coarse classification of a [`SyncError`], used to pick a process exit
/// status at the outermost boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing tracking reference, missing credentials, bad config values.
    Configuration,
    /// A commit contains a change the engine does not know how to apply.
    Classification,
    /// The management server rejected or failed a call.
    RemoteApi,
    /// Unreadable or corrupt local files, or the repository itself.
    LocalState,
}

impl ErrorKind {
    /// sysexits(3) status for this kind.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Configuration => 78,
            ErrorKind::Classification => 65,
            ErrorKind::RemoteApi => 69,
            ErrorKind::LocalState => 74,
        }
    }
}

/// All errors that can arise from push, pull, and comparison.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The repository is not in a state hook-driven sync can start from.
    #[error("{0}")]
    Configuration(String),

    #[error("unsupported change '{status}' for {path} in commit {commit}")]
    Classification {
        commit: String,
        path: PathBuf,
        status: char,
    },

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A history note failed under the strict policy.
    #[error("history note for script {id} at {commit} failed: {source}")]
    HistoryNote {
        id: ScriptId,
        commit: String,
        #[source]
        source: RemoteError,
    },

    #[error("local state error: {0}")]
    Local(#[from] LocalStateError),

    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (note ledger).
    #[error("history ledger JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A change failed mid-push; nothing after it was applied.
    #[error("push stopped at {commit} ({path}): {source}")]
    Aborted {
        commit: String,
        path: PathBuf,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Config(_) | SyncError::Configuration(_) => ErrorKind::Configuration,
            SyncError::Classification { .. } => ErrorKind::Classification,
            SyncError::Remote(_) | SyncError::HistoryNote { .. } => ErrorKind::RemoteApi,
            SyncError::Local(_) | SyncError::Git(_) | SyncError::Io { .. } | SyncError::Json(_) => {
                ErrorKind::LocalState
            }
            SyncError::Aborted { source, .. } => source.kind(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

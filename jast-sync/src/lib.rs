//! # jast-sync
//!
//! Commit-driven push and collision-aware pull between a local script
//! mirror and the management server.
//!
//! Call [`run_push_hook`] from the pre-push hook to replay unpushed commits,
//! [`run_push`] for an explicit push of the working copy, and [`pull`] to
//! mirror remote scripts locally.

pub mod classify;
pub mod collision;
pub mod compare;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod pipeline;
pub mod range;
pub mod writer;

#[cfg(test)]
mod fake;

pub use classify::{Change, ChangeKind, PlannedCommit};
pub use collision::{pull, Always, Collision, CollisionDecider, CollisionReason, Decision, PullAction, PullReport};
pub use compare::{diff_script, status, ScriptDiff, StatusEntry, SyncState};
pub use error::{ErrorKind, SyncError};
pub use history::{HistoryNotePublisher, NoteReport};
pub use orchestrator::{Action, ChangeOutcome, DeleteMode, PushOptions, PushReport, SyncOrchestrator};
pub use pipeline::{run_push, run_push_hook, HookContext, PushScope};
pub use writer::WriteResult;

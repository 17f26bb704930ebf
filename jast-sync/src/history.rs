//! History notes and the ledger that keeps them from being appended twice.
//!
//! The ledger is a JSON document at `<git dir>/jast/history-ledger.json`
//! recording every `(script id, commit)` pair a note was published for.
//! Writes use the `.tmp` + rename pattern.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jast_core::{HistoryPolicy, ScriptId};
use jast_git::{Commit, CommitId};
use jast_remote::RemoteStore;

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: ScriptId,
    pub commit: String,
    pub published_at: DateTime<Utc>,
}

/// On-disk record of published notes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteLedger {
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
}

/// `<git dir>/jast/history-ledger.json`
pub fn ledger_path(git_dir: &Path) -> PathBuf {
    git_dir.join("jast").join("history-ledger.json")
}

impl NoteLedger {
    /// Load the ledger at `path`; empty if the file does not exist yet.
    pub fn load_at(path: &Path) -> Result<Self, SyncError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_at(&self, path: &Path) -> Result<(), SyncError> {
        let Some(dir) = path.parent() else {
            return Err(io_err(path, std::io::Error::other("invalid ledger path")));
        };
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }
        Ok(())
    }

    pub fn contains(&self, id: ScriptId, commit: &CommitId) -> bool {
        self.entries
            .iter()
            .any(|e| e.id == id && e.commit == commit.as_str())
    }

    pub fn record(&mut self, id: ScriptId, commit: &CommitId) {
        if !self.contains(id, commit) {
            self.entries.push(LedgerEntry {
                id,
                commit: commit.0.clone(),
                published_at: Utc::now(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Text of the note appended for `commit`: `<short id>: <message>`.
pub fn note_text(commit: &Commit) -> String {
    format!("{}: {}", commit.id.short(), commit.message.trim())
}

/// A note that could not be appended under the best-effort policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFailure {
    pub id: ScriptId,
    pub commit: CommitId,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteReport {
    pub published: Vec<(ScriptId, CommitId)>,
    /// Pairs already in the ledger, not sent again.
    pub duplicates: usize,
    pub failures: Vec<NoteFailure>,
}

/// What happened to one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOutcome {
    Published,
    AlreadyRecorded,
    Failed,
}

/// Appends one note per successful upsert, at most once per `(id, commit)`.
#[derive(Debug)]
pub struct HistoryNotePublisher {
    ledger: NoteLedger,
    ledger_path: Option<PathBuf>,
    policy: HistoryPolicy,
    report: NoteReport,
}

impl HistoryNotePublisher {
    /// Publisher backed by the ledger file at `path`.
    pub fn open(path: PathBuf, policy: HistoryPolicy) -> Result<Self, SyncError> {
        let ledger = NoteLedger::load_at(&path)?;
        Ok(Self {
            ledger,
            ledger_path: Some(path),
            policy,
            report: NoteReport::default(),
        })
    }

    /// Publisher that remembers pairs only for its own lifetime.
    pub fn in_memory(policy: HistoryPolicy) -> Self {
        Self {
            ledger: NoteLedger::default(),
            ledger_path: None,
            policy,
            report: NoteReport::default(),
        }
    }

    pub fn report(&self) -> &NoteReport {
        &self.report
    }

    pub fn ledger(&self) -> &NoteLedger {
        &self.ledger
    }

    /// Append the note for `commit` to script `id`.
    ///
    /// Under [`HistoryPolicy::BestEffort`] a failed append is recorded in the
    /// report and `Ok(NoteOutcome::Failed)` is returned; under
    /// [`HistoryPolicy::Strict`] it is returned as an error.
    pub fn publish<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
        id: ScriptId,
        commit: &Commit,
    ) -> Result<NoteOutcome, SyncError> {
        if self.ledger.contains(id, &commit.id) {
            tracing::debug!(%id, commit = %commit.id.short(), "history note already recorded");
            self.report.duplicates += 1;
            return Ok(NoteOutcome::AlreadyRecorded);
        }

        let text = note_text(commit);
        if let Err(source) = store.append_history_note(id, &text) {
            return match self.policy {
                HistoryPolicy::Strict => Err(SyncError::HistoryNote {
                    id,
                    commit: commit.id.short().to_string(),
                    source,
                }),
                HistoryPolicy::BestEffort => {
                    tracing::warn!(%id, commit = %commit.id.short(), error = %source, "history note failed; continuing");
                    self.report.failures.push(NoteFailure {
                        id,
                        commit: commit.id.clone(),
                        message: source.to_string(),
                    });
                    Ok(NoteOutcome::Failed)
                }
            };
        }

        self.ledger.record(id, &commit.id);
        self.report.published.push((id, commit.id.clone()));
        if let Some(path) = &self.ledger_path {
            if let Err(err) = self.ledger.save_at(path) {
                match self.policy {
                    HistoryPolicy::Strict => return Err(err),
                    HistoryPolicy::BestEffort => {
                        tracing::warn!(path = %path.display(), error = %err, "could not save history ledger")
                    }
                }
            }
        }
        tracing::info!(%id, commit = %commit.id.short(), "history note appended");
        Ok(NoteOutcome::Published)
    }
}

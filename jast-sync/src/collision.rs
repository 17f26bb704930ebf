//! Pull: bring a fresh remote snapshot into the local mirror.
//!
//! Only `list` is ever called on the store. Scripts whose local copy differs
//! from the remote one, or cannot be read at all, are handed to a
//! [`CollisionDecider`] unless the pull is forced.

use jast_core::local::{self, LocalIndex};
use jast_core::{LocalScript, LocalStateError, RemoteScript, ScriptId, ScriptLayout, ScriptName};
use jast_remote::RemoteStore;

use crate::compare::{match_remote, same_content, Match};
use crate::error::SyncError;
use crate::writer::write_script;

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Overwrite,
    Skip,
}

/// Why a script needs a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollisionReason {
    ContentDiffers,
    /// The local descriptor or body could not be read.
    UnreadableLocal(String),
}

/// A differing local/remote pair awaiting a decision.
#[derive(Debug, Clone, Copy)]
pub struct Collision<'a> {
    pub name: &'a ScriptName,
    pub remote: &'a RemoteScript,
    /// `None` when the local copy is unreadable.
    pub local: Option<&'a LocalScript>,
    pub reason: &'a CollisionReason,
}

/// Supplies overwrite/skip decisions, typically by asking the user.
pub trait CollisionDecider {
    fn decide(&mut self, collision: &Collision<'_>) -> Decision;
}

/// Decides the same way every time.
#[derive(Debug, Clone, Copy)]
pub struct Always(pub Decision);

impl CollisionDecider for Always {
    fn decide(&mut self, _collision: &Collision<'_>) -> Decision {
        self.0
    }
}

impl<F> CollisionDecider for F
where
    F: FnMut(&Collision<'_>) -> Decision,
{
    fn decide(&mut self, collision: &Collision<'_>) -> Decision {
        self(collision)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullAction {
    /// No local copy existed.
    Created,
    Unchanged,
    Overwritten,
    Skipped,
    /// The remote name is used locally by a script bound to `other`.
    NameTaken { other: ScriptId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullOutcome {
    pub id: ScriptId,
    pub name: ScriptName,
    pub action: PullAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    pub outcomes: Vec<PullOutcome>,
}

impl PullReport {
    pub fn count(&self, action: &PullAction) -> usize {
        self.outcomes.iter().filter(|o| &o.action == action).count()
    }
}

// ---------------------------------------------------------------------------
// Pull
// ---------------------------------------------------------------------------

/// Mirror every remote script locally. With `force`, differing or unreadable
/// local copies are overwritten without consulting `decider`.
pub fn pull<S, D>(
    store: &S,
    layout: &ScriptLayout,
    force: bool,
    decider: &mut D,
) -> Result<PullReport, SyncError>
where
    S: RemoteStore + ?Sized,
    D: CollisionDecider + ?Sized,
{
    let mut remote = store.list()?;
    remote.sort_by_key(|r| r.id);
    let index = local::scan(layout)?;
    tracing::info!(count = remote.len(), "pulling remote scripts");

    let mut report = PullReport::default();
    for record in &remote {
        let outcome = pull_one(layout, &index, record, force, decider)?;
        tracing::debug!(id = %outcome.id, name = %outcome.name, action = ?outcome.action, "pulled");
        report.outcomes.push(outcome);
    }
    Ok(report)
}

fn pull_one<D: CollisionDecider + ?Sized>(
    layout: &ScriptLayout,
    index: &LocalIndex,
    record: &RemoteScript,
    force: bool,
    decider: &mut D,
) -> Result<PullOutcome, SyncError> {
    let name = match match_remote(index, record) {
        Match::ById(name) | Match::ByName(name) | Match::Unmatched(name) => name,
        Match::NameTaken { name, other } => {
            tracing::warn!(
                id = %record.id,
                %name,
                %other,
                "remote name is already used by another local script; skipped"
            );
            return Ok(PullOutcome {
                id: record.id,
                name,
                action: PullAction::NameTaken { other },
            });
        }
    };
    if name.as_str() != record.name {
        tracing::debug!(remote = %record.name, local = %name, "mirroring under local name");
    }

    let wanted = record.to_local(name.clone());
    let local = read_local(layout, index, &name);

    let reason = match &local {
        LocalCopy::Missing => {
            write_script(layout, &wanted)?;
            return Ok(outcome(record, name, PullAction::Created));
        }
        LocalCopy::Present(current) if same_content(current, &wanted) => {
            return Ok(outcome(record, name, PullAction::Unchanged));
        }
        LocalCopy::Present(_) => CollisionReason::ContentDiffers,
        LocalCopy::Unreadable(message) => CollisionReason::UnreadableLocal(message.clone()),
    };

    let decision = if force {
        Decision::Overwrite
    } else {
        let collision = Collision {
            name: &name,
            remote: record,
            local: match &local {
                LocalCopy::Present(current) => Some(current),
                _ => None,
            },
            reason: &reason,
        };
        decider.decide(&collision)
    };

    match decision {
        Decision::Overwrite => {
            let writes = write_script(layout, &wanted)?;
            let written = writes.iter().filter(|w| w.is_written()).count();
            tracing::info!(%name, files = written, "overwrote local copy");
            Ok(outcome(record, name, PullAction::Overwritten))
        }
        Decision::Skip => Ok(outcome(record, name, PullAction::Skipped)),
    }
}

fn outcome(record: &RemoteScript, name: ScriptName, action: PullAction) -> PullOutcome {
    PullOutcome {
        id: record.id,
        name,
        action,
    }
}

enum LocalCopy {
    Missing,
    Present(LocalScript),
    Unreadable(String),
}

/// Current local copy of `name`. A body without a descriptor (or the
/// reverse) counts as present with the missing half empty.
fn read_local(layout: &ScriptLayout, index: &LocalIndex, name: &ScriptName) -> LocalCopy {
    if let Some(message) = index.unreadable.get(name) {
        return LocalCopy::Unreadable(message.clone());
    }

    let metadata = match local::load_metadata(layout, name) {
        Ok(metadata) => Some(metadata),
        Err(LocalStateError::NotFound { .. }) => None,
        Err(err) => return LocalCopy::Unreadable(err.to_string()),
    };
    let body = match local::read_body(layout, name) {
        Ok(body) => Some(body),
        Err(LocalStateError::NotFound { .. }) => None,
        Err(err) => return LocalCopy::Unreadable(err.to_string()),
    };

    match (metadata, body) {
        (None, None) => LocalCopy::Missing,
        (metadata, body) => LocalCopy::Present(LocalScript {
            name: name.clone(),
            metadata: metadata.unwrap_or_default(),
            body: body.unwrap_or_default(),
        }),
    }
}

//! Push: apply classified commits to the remote store.
//!
//! Commits are applied oldest first and changes within a commit in path
//! order, one blocking remote call at a time. The first failing upsert or
//! delete stops the push; history-note failures follow the configured
//! [`HistoryPolicy`](jast_core::HistoryPolicy).

use std::collections::{BTreeMap, BTreeSet};

use jast_core::local;
use jast_core::{Config, LocalScript, LocalStateError, ScriptId, ScriptLayout, ScriptMetadata, ScriptName};
use jast_git::{Commit, CommitId, VersionControl};
use jast_remote::RemoteStore;

use crate::classify::{Change, ChangeKind, ChangeSource, PlannedCommit};
use crate::compare::local_name_for;
use crate::error::SyncError;
use crate::history::{HistoryNotePublisher, NoteReport};

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

/// What a local deletion does to the remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Destroy the record.
    #[default]
    Hard,
    /// Keep the record but deactivate it.
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushOptions {
    pub delete_mode: DeleteMode,
    /// Report what would happen without calling the store or touching
    /// descriptors.
    pub dry_run: bool,
}

impl PushOptions {
    /// Options from config, with `soft_delete` forcing [`DeleteMode::Soft`].
    pub fn from_config(config: &Config, soft_delete: bool, dry_run: bool) -> Self {
        let soft = soft_delete || config.sync.soft_delete;
        Self {
            delete_mode: if soft { DeleteMode::Soft } else { DeleteMode::Hard },
            dry_run,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Deleted,
    Deactivated,
    Skipped(String),
}

/// Result of applying one change. In a dry run the action is the one that
/// would have been taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOutcome {
    /// `None` for explicit pushes outside the hook.
    pub commit: Option<CommitId>,
    pub name: ScriptName,
    pub id: Option<ScriptId>,
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub dry_run: bool,
    pub commits: usize,
    pub outcomes: Vec<ChangeOutcome>,
    pub notes: NoteReport,
}

impl PushReport {
    pub fn count(&self, matches: impl Fn(&Action) -> bool) -> usize {
        self.outcomes.iter().filter(|o| matches(&o.action)).count()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives a hook push over planned commits.
pub struct SyncOrchestrator<'a, S: ?Sized, V: ?Sized> {
    store: &'a S,
    vcs: &'a V,
    layout: &'a ScriptLayout,
    options: PushOptions,
}

impl<'a, S, V> SyncOrchestrator<'a, S, V>
where
    S: RemoteStore + ?Sized,
    V: VersionControl + ?Sized,
{
    pub fn new(store: &'a S, vcs: &'a V, layout: &'a ScriptLayout, options: PushOptions) -> Self {
        Self {
            store,
            vcs,
            layout,
            options,
        }
    }

    /// Apply every planned commit in order.
    pub fn push(
        &self,
        planned: &[PlannedCommit],
        publisher: &mut HistoryNotePublisher,
    ) -> Result<PushReport, SyncError> {
        let mut report = PushReport {
            dry_run: self.options.dry_run,
            commits: planned.len(),
            ..PushReport::default()
        };
        let mut run = RunState::new(planned);

        for PlannedCommit { commit, changes } in planned {
            tracing::info!(commit = %commit.id.short(), subject = commit.subject(), "applying commit");
            let abort = |change: &Change, source: SyncError| SyncError::Aborted {
                commit: commit.id.short().to_string(),
                path: change.path.clone(),
                source: Box::new(source),
            };
            let upserted = self.upserted_ids(commit, changes).map_err(|(change, source)| abort(change, source))?;
            for change in changes {
                let outcome = self
                    .apply(commit, change, &upserted, &mut run, publisher)
                    .map_err(|source| abort(change, source))?;
                report.outcomes.push(outcome);
            }
        }

        report.notes = publisher.report().clone();
        Ok(report)
    }

    fn apply(
        &self,
        commit: &Commit,
        change: &Change,
        upserted: &BTreeMap<ScriptId, ScriptName>,
        run: &mut RunState,
        publisher: &mut HistoryNotePublisher,
    ) -> Result<ChangeOutcome, SyncError> {
        let (id, action) = match change.kind {
            ChangeKind::Upsert => self.upsert(commit, change, run)?,
            ChangeKind::Delete => self.delete(commit, change, upserted, run)?,
        };

        if change.kind == ChangeKind::Upsert && !self.options.dry_run {
            if let (Some(id), Action::Created | Action::Updated) = (id, &action) {
                publisher.publish(self.store, id, commit)?;
            }
        }

        Ok(ChangeOutcome {
            commit: Some(commit.id.clone()),
            name: change.name.clone(),
            id,
            action,
        })
    }

    /// Ids the commit's upserts will write, keyed to their new names. A
    /// delete of one of these ids in the same commit is a rename.
    fn upserted_ids<'c>(
        &self,
        commit: &Commit,
        changes: &'c [Change],
    ) -> Result<BTreeMap<ScriptId, ScriptName>, (&'c Change, SyncError)> {
        let mut ids = BTreeMap::new();
        for change in changes.iter().filter(|c| c.kind == ChangeKind::Upsert) {
            let lookup = || -> Result<Option<ScriptId>, SyncError> {
                if self.vcs.show_file(&commit.id, &change.path)?.is_none() {
                    return Ok(None);
                }
                Ok(self.metadata_for(commit, &change.name)?.id)
            };
            if let Some(id) = lookup().map_err(|err| (change, err))? {
                ids.insert(id, change.name.clone());
            }
        }
        Ok(ids)
    }

    /// Body from the commit tree, descriptor from the working copy.
    fn upsert(
        &self,
        commit: &Commit,
        change: &Change,
        run: &mut RunState,
    ) -> Result<(Option<ScriptId>, Action), SyncError> {
        let Some(body) = self.vcs.show_file(&commit.id, &change.path)? else {
            if change.source == ChangeSource::Metadata {
                return Ok((None, Action::Skipped("descriptor changed, body not in commit".to_string())));
            }
            return Err(LocalStateError::NotFound {
                path: change.path.clone(),
            }
            .into());
        };
        let mut metadata = self.metadata_for(commit, &change.name)?;
        match (metadata.id, run.created.get(&change.name)) {
            (Some(id), _) if run.removed.contains(&id) => {
                tracing::info!(name = %change.name, %id, "id was deleted earlier in this push; creating again");
                metadata.id = None;
            }
            (None, Some(Some(id))) => metadata.id = Some(*id),
            // Created earlier in this dry run, so there is no id to show.
            (None, Some(None)) => return Ok((None, Action::Updated)),
            _ => {}
        }

        let script = LocalScript {
            name: change.name.clone(),
            metadata,
            body,
        };
        let persist = !run.deleted_at_end.contains(&change.name);
        let (id, action) = upsert_script(self.store, self.layout, script, self.options.dry_run, persist)?;
        if action == Action::Created {
            run.created.insert(change.name.clone(), id);
        }
        Ok((id, action))
    }

    /// Working-copy descriptor, else the one committed alongside the body,
    /// else defaults for a script added without a descriptor.
    fn metadata_for(&self, commit: &Commit, name: &ScriptName) -> Result<ScriptMetadata, SyncError> {
        match local::load_metadata(self.layout, name) {
            Ok(metadata) => Ok(metadata),
            Err(LocalStateError::NotFound { .. }) => {
                let rel = self.layout.relative_metadata_path(name);
                match self.vcs.show_file(&commit.id, &rel)? {
                    Some(text) => Ok(local::parse_metadata(&rel, &text)?),
                    None => Ok(ScriptMetadata::default()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    fn delete(
        &self,
        commit: &Commit,
        change: &Change,
        upserted: &BTreeMap<ScriptId, ScriptName>,
        run: &mut RunState,
    ) -> Result<(Option<ScriptId>, Action), SyncError> {
        let action = match self.options.delete_mode {
            DeleteMode::Hard => Action::Deleted,
            DeleteMode::Soft => Action::Deactivated,
        };
        let id = match run.created.get(&change.name) {
            Some(Some(id)) => *id,
            Some(None) => return Ok((None, action)),
            None => self.deleted_id(commit, &change.name)?,
        };

        if let Some(new_name) = upserted.get(&id) {
            tracing::info!(%id, from = %change.name, to = %new_name, "rename; the record is kept");
            return Ok((Some(id), Action::Skipped(format!("renamed to {new_name}"))));
        }
        if self.options.dry_run {
            return Ok((Some(id), action));
        }

        let result = match self.options.delete_mode {
            DeleteMode::Hard => self.store.delete(id),
            DeleteMode::Soft => self.store.deactivate(id),
        };
        match result {
            Ok(()) => {}
            Err(err) if err.is_not_found() && self.options.delete_mode == DeleteMode::Hard => {
                tracing::info!(%id, name = %change.name, "remote record already gone");
            }
            Err(err) => return Err(err.into()),
        }
        run.created.remove(&change.name);
        run.removed.insert(id);
        Ok((Some(id), action))
    }

    /// The body is gone, so the id comes from a retained descriptor, the
    /// descriptor in the parent commit, or a server script of the same name.
    fn deleted_id(&self, commit: &Commit, name: &ScriptName) -> Result<ScriptId, SyncError> {
        match local::load_metadata(self.layout, name) {
            Ok(ScriptMetadata { id: Some(id), .. }) => return Ok(id),
            Ok(_) | Err(LocalStateError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        if let Some(parent) = commit.single_parent() {
            let rel = self.layout.relative_metadata_path(name);
            if let Some(text) = self.vcs.show_file(parent, &rel)? {
                if let Some(id) = local::parse_metadata(&rel, &text)?.id {
                    return Ok(id);
                }
            }
        }

        let mut matches = self
            .store
            .list()?
            .into_iter()
            .filter(|remote| local_name_for(&remote.name) == *name)
            .map(|remote| remote.id);
        match (matches.next(), matches.next()) {
            (Some(id), None) => {
                tracing::info!(%name, %id, "resolved deleted script by server name");
                Ok(id)
            }
            _ => Err(LocalStateError::NoRemoteId { name: name.clone() }.into()),
        }
    }
}

/// What earlier changes of one push learned about script identities.
#[derive(Debug, Default)]
struct RunState {
    /// Names whose last change in the range is a delete. Creating such a
    /// script does not write its descriptor back.
    deleted_at_end: BTreeSet<ScriptName>,
    /// Scripts created by this push. The id is `None` in a dry run.
    created: BTreeMap<ScriptName, Option<ScriptId>>,
    /// Ids deleted or deactivated by this push.
    removed: BTreeSet<ScriptId>,
}

impl RunState {
    fn new(planned: &[PlannedCommit]) -> Self {
        let mut deleted_at_end = BTreeSet::new();
        for change in planned.iter().flat_map(|p| &p.changes) {
            match change.kind {
                ChangeKind::Delete => deleted_at_end.insert(change.name.clone()),
                ChangeKind::Upsert => deleted_at_end.remove(&change.name),
            };
        }
        Self {
            deleted_at_end,
            ..Self::default()
        }
    }
}

/// Create or update `script`. Unless `persist` is false, a fresh id is
/// written into the local descriptor before returning.
fn upsert_script<S: RemoteStore + ?Sized>(
    store: &S,
    layout: &ScriptLayout,
    mut script: LocalScript,
    dry_run: bool,
    persist: bool,
) -> Result<(Option<ScriptId>, Action), SyncError> {
    if let Some(id) = script.metadata.id {
        if !dry_run {
            store.update(id, &script)?;
        }
        return Ok((Some(id), Action::Updated));
    }
    if dry_run {
        return Ok((None, Action::Created));
    }

    let id = store.create(&script)?;
    if persist {
        script.metadata.id = Some(id);
        local::save_metadata(layout, &script.name, &script.metadata)?;
        tracing::info!(name = %script.name, %id, "recorded remote id");
    }
    Ok((Some(id), Action::Created))
}

// ---------------------------------------------------------------------------
// Explicit pushes
// ---------------------------------------------------------------------------

/// Push the working-copy state of `names` outside the hook. No history notes
/// are written.
pub fn push_scripts<S: RemoteStore + ?Sized>(
    store: &S,
    layout: &ScriptLayout,
    names: &[ScriptName],
    dry_run: bool,
) -> Result<PushReport, SyncError> {
    let mut report = PushReport {
        dry_run,
        ..PushReport::default()
    };
    for name in names {
        let script = local::load_script(layout, name)?;
        let (id, action) = upsert_script(store, layout, script, dry_run, true)?;
        tracing::info!(%name, ?action, "pushed");
        report.outcomes.push(ChangeOutcome {
            commit: None,
            name: name.clone(),
            id,
            action,
        });
    }
    Ok(report)
}

/// Local names for remote ids, failing on the first unknown id.
pub fn names_for_ids(layout: &ScriptLayout, ids: &[ScriptId]) -> Result<Vec<ScriptName>, SyncError> {
    let index = local::scan(layout)?;
    index.ensure_unique()?;
    ids.iter()
        .map(|id| {
            index
                .name_for(*id)
                .cloned()
                .ok_or(SyncError::Local(LocalStateError::UnknownId { id: *id }))
        })
        .collect()
}

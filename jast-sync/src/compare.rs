//! Local/remote matching and content comparison.
//!
//! Pull, `scripts status`, and `scripts diff` all pair remote records with
//! local mirrors the same way: by remote id first, then by name for records
//! that have no local mirror carrying their id.

use std::borrow::Cow;

use serde::Serialize;
use sha2::{Digest, Sha256};
use similar::TextDiff;

use jast_core::local::{self, LocalIndex};
use jast_core::{LocalScript, RemoteScript, ScriptId, ScriptLayout, ScriptMetadata, ScriptName};
use jast_remote::RemoteStore;

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Digests
// ---------------------------------------------------------------------------

/// Body text with CRLF line endings folded to LF.
pub fn normalize(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

pub fn sha256_hex(content: &str) -> String {
    let mut h = Sha256::new();
    h.update(content.as_bytes());
    hex::encode(h.finalize())
}

/// TOML text of a descriptor as it would be saved.
pub fn metadata_text(metadata: &ScriptMetadata) -> String {
    toml::to_string(metadata).unwrap_or_else(|_| format!("{metadata:?}"))
}

/// Digest of the normalised body plus the descriptor.
pub fn content_digest(script: &LocalScript) -> String {
    let mut h = Sha256::new();
    h.update(normalize(&script.body).as_bytes());
    h.update([0u8]);
    h.update(metadata_text(&script.metadata).as_bytes());
    hex::encode(h.finalize())
}

pub fn same_content(a: &LocalScript, b: &LocalScript) -> bool {
    content_digest(a) == content_digest(b)
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// How a remote record pairs with the local mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// A descriptor carries the record's id.
    ById(ScriptName),
    /// No descriptor carries the id, but one with the same name has none
    /// (or cannot be read).
    ByName(ScriptName),
    /// The name is taken by a descriptor bound to a different id.
    NameTaken { name: ScriptName, other: ScriptId },
    /// Nothing local corresponds to the record.
    Unmatched(ScriptName),
}

/// File stem a remote record is mirrored under when it has no local match.
pub fn local_name_for(remote_name: &str) -> ScriptName {
    let stem: String = remote_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    ScriptName::from(stem)
}

pub fn match_remote(index: &LocalIndex, remote: &RemoteScript) -> Match {
    if let Some(name) = index.name_for(remote.id) {
        return Match::ById(name.clone());
    }
    if let Some(first) = index.conflicts.get(&remote.id).and_then(|names| names.first()) {
        return Match::ById(first.clone());
    }
    let name = local_name_for(&remote.name);
    if !index.names.contains(&name) {
        return Match::Unmatched(name);
    }
    match index.by_id.iter().find(|(_, n)| **n == name) {
        Some((other, _)) => Match::NameTaken {
            name,
            other: *other,
        },
        None => Match::ByName(name),
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    InSync,
    Modified,
    /// Present locally, never pushed.
    LocalOnly,
    /// Present remotely, not mirrored.
    RemoteOnly,
    /// Local descriptor carries an id the server no longer has.
    Orphaned,
    /// Local files exist but cannot be read.
    Unreadable,
    /// The remote name collides with a local script bound to another id.
    Conflict,
}

/// One row of `jast scripts status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub name: ScriptName,
    pub id: Option<ScriptId>,
    pub remote_name: Option<String>,
    pub state: SyncState,
}

/// Compare every local mirror against a fresh remote snapshot.
pub fn status<S: RemoteStore + ?Sized>(
    store: &S,
    layout: &ScriptLayout,
) -> Result<Vec<StatusEntry>, SyncError> {
    let remote = store.list()?;
    let index = local::scan(layout)?;
    let mut seen = std::collections::BTreeSet::new();
    let mut entries = Vec::new();

    for record in &remote {
        let (name, state) = match match_remote(&index, record) {
            Match::ById(name) | Match::ByName(name) => {
                let state = local_state(layout, &index, &name, record);
                (name, state)
            }
            Match::NameTaken { name, .. } => (name, SyncState::Conflict),
            Match::Unmatched(name) => (name, SyncState::RemoteOnly),
        };
        if state != SyncState::RemoteOnly && state != SyncState::Conflict {
            seen.insert(name.clone());
        }
        entries.push(StatusEntry {
            name,
            id: Some(record.id),
            remote_name: Some(record.name.clone()),
            state,
        });
    }

    for name in index.names.iter().filter(|n| !seen.contains(*n)) {
        let id = index.by_id.iter().find(|(_, n)| *n == name).map(|(id, _)| *id);
        let state = if index.unreadable.contains_key(name) {
            SyncState::Unreadable
        } else if id.is_some() {
            SyncState::Orphaned
        } else {
            SyncState::LocalOnly
        };
        entries.push(StatusEntry {
            name: name.clone(),
            id,
            remote_name: None,
            state,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(entries)
}

fn local_state(
    layout: &ScriptLayout,
    index: &LocalIndex,
    name: &ScriptName,
    remote: &RemoteScript,
) -> SyncState {
    if index.unreadable.contains_key(name) {
        return SyncState::Unreadable;
    }
    match local::load_script(layout, name) {
        Ok(local) if same_content(&local, &remote.to_local(name.clone())) => SyncState::InSync,
        Ok(_) => SyncState::Modified,
        Err(_) => SyncState::Unreadable,
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Unified diff of `old` → `new`; empty when they are equal.
pub fn unified_diff(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    let old = normalize(old);
    let new = normalize(new);
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(&*old, &*new)
        .unified_diff()
        .header(old_label, new_label)
        .context_radius(3)
        .to_string()
}

/// Local-versus-remote diff of one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDiff {
    pub name: ScriptName,
    pub id: ScriptId,
    pub body: String,
    pub metadata: String,
}

impl ScriptDiff {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.metadata.is_empty()
    }
}

/// Diff `local` against `remote`, labelling sides by file path.
pub fn diff_scripts(layout: &ScriptLayout, local: &LocalScript, remote: &RemoteScript) -> ScriptDiff {
    let remote_local = remote.to_local(local.name.clone());
    let body_path = layout.relative_script_path(&local.name);
    let meta_path = layout.relative_metadata_path(&local.name);
    ScriptDiff {
        name: local.name.clone(),
        id: remote.id,
        body: unified_diff(
            &local.body,
            &remote_local.body,
            &format!("local/{}", body_path.display()),
            &format!("remote/{}", body_path.display()),
        ),
        metadata: unified_diff(
            &metadata_text(&local.metadata),
            &metadata_text(&remote_local.metadata),
            &format!("local/{}", meta_path.display()),
            &format!("remote/{}", meta_path.display()),
        ),
    }
}

/// Diff the local script `name` against its remote record. A script that
/// was never pushed has nothing to diff against.
pub fn diff_script<S: RemoteStore + ?Sized>(
    store: &S,
    layout: &ScriptLayout,
    name: &ScriptName,
) -> Result<ScriptDiff, SyncError> {
    let local = local::load_script(layout, name)?;
    let Some(id) = local.metadata.id else {
        return Err(SyncError::Configuration(format!(
            "'{name}' has no remote id yet; push it first"
        )));
    };
    let remote = store.get(id)?;
    Ok(diff_scripts(layout, &local, &remote))
}

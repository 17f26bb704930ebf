//! The remote store seam consumed by the sync engine.

use jast_core::{LocalScript, RemoteScript, ScriptId};

use crate::error::RemoteError;

/// Prefix applied to the name of a soft-deleted script.
pub const DEACTIVATED_PREFIX: &str = "[DEACTIVATED] ";

/// Server-side system of record for scripts, addressed by [`ScriptId`].
///
/// Every call is a single blocking attempt; retries and rate limiting belong
/// to the implementation, never to callers.
pub trait RemoteStore {
    /// Create a new record and return its freshly assigned id.
    fn create(&self, script: &LocalScript) -> Result<ScriptId, RemoteError>;

    /// Replace name, body, and mirrored attributes of an existing record.
    fn update(&self, id: ScriptId, script: &LocalScript) -> Result<(), RemoteError>;

    /// Destroy the record.
    fn delete(&self, id: ScriptId) -> Result<(), RemoteError>;

    /// Retain the record but make it inert.
    fn deactivate(&self, id: ScriptId) -> Result<(), RemoteError>;

    /// Full snapshot of every record, bodies included.
    fn list(&self) -> Result<Vec<RemoteScript>, RemoteError>;

    fn get(&self, id: ScriptId) -> Result<RemoteScript, RemoteError>;

    /// Append a free-text audit entry to the record's history.
    fn append_history_note(&self, id: ScriptId, note: &str) -> Result<(), RemoteError>;
}

/// Name a record carries once deactivated. Applying it twice is a no-op.
pub fn deactivated_name(name: &str) -> String {
    if name.starts_with(DEACTIVATED_PREFIX) {
        name.to_string()
    } else {
        format!("{DEACTIVATED_PREFIX}{name}")
    }
}

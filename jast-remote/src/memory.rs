//! In-process [`RemoteStore`] that records every call.
//!
//! Used by the sync engine's tests to assert exactly which remote
//! operations a push or pull issued, and to inject failures.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use jast_core::{LocalScript, RemoteScript, ScriptId};

use crate::error::RemoteError;
use crate::store::{deactivated_name, RemoteStore};

/// First id handed out by [`MemoryStore::new`].
pub const FIRST_ID: u64 = 101;

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { name: String, body: String },
    Update { id: ScriptId, body: String },
    Delete(ScriptId),
    Deactivate(ScriptId),
    List,
    Get(ScriptId),
    AppendHistoryNote { id: ScriptId, note: String },
}

impl Call {
    /// True for calls that change server state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::List | Call::Get(_))
    }
}

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Deactivate,
    List,
    AppendHistoryNote,
}

#[derive(Debug, Default)]
struct State {
    scripts: BTreeMap<ScriptId, RemoteScript>,
    next_id: u64,
    calls: Vec<Call>,
    failing: BTreeSet<Operation>,
}

#[derive(Debug)]
pub struct MemoryStore {
    state: RefCell<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                next_id: FIRST_ID,
                ..State::default()
            }),
        }
    }

    /// Seed a record as if it already existed on the server.
    pub fn insert(&self, script: RemoteScript) {
        let mut state = self.state.borrow_mut();
        state.next_id = state.next_id.max(script.id.0 + 1);
        state.scripts.insert(script.id, script);
    }

    /// Make every subsequent call of `op` fail with HTTP 500.
    pub fn fail(&self, op: Operation) {
        self.state.borrow_mut().failing.insert(op);
    }

    pub fn recover(&self, op: Operation) {
        self.state.borrow_mut().failing.remove(&op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn script(&self, id: ScriptId) -> Option<RemoteScript> {
        self.state.borrow().scripts.get(&id).cloned()
    }

    pub fn scripts(&self) -> Vec<RemoteScript> {
        self.state.borrow().scripts.values().cloned().collect()
    }

    /// History notes appended so far, in call order.
    pub fn notes(&self) -> Vec<(ScriptId, String)> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::AppendHistoryNote { id, note } => Some((*id, note.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call, op: Option<Operation>) -> Result<(), RemoteError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        match op {
            Some(op) if state.failing.contains(&op) => Err(RemoteError::Status {
                status: 500,
                url: format!("memory://{op:?}"),
                body: "injected failure".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn missing(id: ScriptId) -> RemoteError {
        RemoteError::Status {
            status: 404,
            url: format!("memory://scripts/{id}"),
            body: "not found".to_string(),
        }
    }
}

fn to_remote(id: ScriptId, script: &LocalScript) -> RemoteScript {
    let mut metadata = script.metadata.clone();
    metadata.id = Some(id);
    RemoteScript {
        id,
        name: script.name.0.clone(),
        body: script.body.clone(),
        metadata,
    }
}

impl RemoteStore for MemoryStore {
    fn create(&self, script: &LocalScript) -> Result<ScriptId, RemoteError> {
        self.record(
            Call::Create {
                name: script.name.0.clone(),
                body: script.body.clone(),
            },
            Some(Operation::Create),
        )?;
        let mut state = self.state.borrow_mut();
        let id = ScriptId(state.next_id);
        state.next_id += 1;
        state.scripts.insert(id, to_remote(id, script));
        Ok(id)
    }

    fn update(&self, id: ScriptId, script: &LocalScript) -> Result<(), RemoteError> {
        self.record(
            Call::Update {
                id,
                body: script.body.clone(),
            },
            Some(Operation::Update),
        )?;
        let mut state = self.state.borrow_mut();
        if !state.scripts.contains_key(&id) {
            return Err(Self::missing(id));
        }
        state.scripts.insert(id, to_remote(id, script));
        Ok(())
    }

    fn delete(&self, id: ScriptId) -> Result<(), RemoteError> {
        self.record(Call::Delete(id), Some(Operation::Delete))?;
        self.state
            .borrow_mut()
            .scripts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::missing(id))
    }

    fn deactivate(&self, id: ScriptId) -> Result<(), RemoteError> {
        self.record(Call::Deactivate(id), Some(Operation::Deactivate))?;
        let mut state = self.state.borrow_mut();
        let script = state.scripts.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        script.name = deactivated_name(&script.name);
        Ok(())
    }

    fn list(&self) -> Result<Vec<RemoteScript>, RemoteError> {
        self.record(Call::List, Some(Operation::List))?;
        Ok(self.scripts())
    }

    fn get(&self, id: ScriptId) -> Result<RemoteScript, RemoteError> {
        self.record(Call::Get(id), None)?;
        self.script(id).ok_or_else(|| Self::missing(id))
    }

    fn append_history_note(&self, id: ScriptId, note: &str) -> Result<(), RemoteError> {
        self.record(
            Call::AppendHistoryNote {
                id,
                note: note.to_string(),
            },
            Some(Operation::AppendHistoryNote),
        )
    }
}

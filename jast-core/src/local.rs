//! Local mirror of scripts: body files plus TOML descriptors.
//!
//! # Storage layout
//!
//! ```text
//! <repo root>/
//!   <scripts dir>/
//!     <name>.sh             (script body)
//!     metadata/
//!       <name>.toml         (descriptor; `metadata_in_subfolder = true`)
//! ```
//!
//! Descriptor and body writes go through a sibling `.tmp` file followed by a
//! `rename`, so a crash never leaves a truncated file behind.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{io_err, LocalStateError};
use crate::types::{LocalScript, ScriptId, ScriptMetadata, ScriptName};

/// Template body for `jast scripts new`.
pub const NEW_SCRIPT_TEMPLATE: &str = "#!/bin/bash\n\n";

const METADATA_EXTENSION: &str = "toml";

// ---------------------------------------------------------------------------
// 1. Layout
// ---------------------------------------------------------------------------

/// Where script bodies and descriptors live, relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLayout {
    root: PathBuf,
    scripts_dir: PathBuf,
    metadata_dir: PathBuf,
    extension: String,
}

/// What a repository-relative path means to the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedPath {
    /// `<scripts dir>/<name>.<ext>`
    Script(ScriptName),
    /// `<metadata dir>/<name>.toml`
    Metadata(ScriptName),
}

impl ScriptLayout {
    /// Build a layout. `scripts_dir` and `metadata_dir` may be relative to
    /// `root` or absolute paths inside it.
    pub fn new(
        root: impl Into<PathBuf>,
        scripts_dir: impl AsRef<Path>,
        metadata_dir: impl AsRef<Path>,
        extension: impl Into<String>,
    ) -> Self {
        let root = root.into();
        let scripts_dir = relative_to(&root, scripts_dir.as_ref());
        let metadata_dir = relative_to(&root, metadata_dir.as_ref());
        let extension = extension.into().trim_start_matches('.').to_string();
        Self {
            root,
            scripts_dir,
            metadata_dir,
            extension,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join(&self.scripts_dir)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(&self.metadata_dir)
    }

    /// Body path relative to the repository root (as version control sees it).
    pub fn relative_script_path(&self, name: &ScriptName) -> PathBuf {
        self.scripts_dir.join(format!("{}.{}", name.0, self.extension))
    }

    /// Descriptor path relative to the repository root.
    pub fn relative_metadata_path(&self, name: &ScriptName) -> PathBuf {
        self.metadata_dir
            .join(format!("{}.{METADATA_EXTENSION}", name.0))
    }

    pub fn script_path(&self, name: &ScriptName) -> PathBuf {
        self.root.join(self.relative_script_path(name))
    }

    pub fn metadata_path(&self, name: &ScriptName) -> PathBuf {
        self.root.join(self.relative_metadata_path(name))
    }

    /// Recognise a repository-relative path as a script body or descriptor.
    ///
    /// Only direct children of the configured directories count; anything in
    /// a nested folder or with another extension is ignored.
    pub fn classify(&self, path: &Path) -> Option<TrackedPath> {
        let parent = path.parent().unwrap_or(Path::new(""));
        let stem = path.file_stem()?.to_str()?;
        let ext = path.extension()?.to_str()?;
        if stem.is_empty() {
            return None;
        }

        let parent = normalize(parent);
        if ext == self.extension && parent == self.scripts_dir {
            return Some(TrackedPath::Script(ScriptName::from(stem)));
        }
        if ext == METADATA_EXTENSION && parent == self.metadata_dir {
            return Some(TrackedPath::Metadata(ScriptName::from(stem)));
        }
        None
    }
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Parse descriptor text. `path` is only used for error context, which lets
/// callers parse descriptors read out of historical commits.
pub fn parse_metadata(path: &Path, text: &str) -> Result<ScriptMetadata, LocalStateError> {
    toml::from_str(text).map_err(|source| LocalStateError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the descriptor for `name`.
///
/// Returns `LocalStateError::NotFound` if absent and
/// `LocalStateError::Parse` (with path) if malformed.
pub fn load_metadata(
    layout: &ScriptLayout,
    name: &ScriptName,
) -> Result<ScriptMetadata, LocalStateError> {
    let path = layout.metadata_path(name);
    let text = read_existing(&path)?;
    parse_metadata(&path, &text)
}

/// Read the body file for `name`.
pub fn read_body(layout: &ScriptLayout, name: &ScriptName) -> Result<String, LocalStateError> {
    read_existing(&layout.script_path(name))
}

/// Load descriptor and body together.
pub fn load_script(layout: &ScriptLayout, name: &ScriptName) -> Result<LocalScript, LocalStateError> {
    let metadata = load_metadata(layout, name)?;
    let body = read_body(layout, name)?;
    Ok(LocalScript {
        name: name.clone(),
        metadata,
        body,
    })
}

/// Names of every script with a descriptor, sorted.
pub fn list_names(layout: &ScriptLayout) -> Result<Vec<ScriptName>, LocalStateError> {
    let dir = layout.metadata_dir();
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(io_err(dir, err)),
    };

    let mut names: Vec<ScriptName> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| {
            let path = e.path();
            if path.extension().and_then(|x| x.to_str()) != Some(METADATA_EXTENSION) {
                return None;
            }
            let stem = path.file_stem()?.to_str()?.to_string();
            Some(ScriptName::from(stem))
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Snapshot of which local descriptors exist and which remote ids they claim.
#[derive(Debug, Clone, Default)]
pub struct LocalIndex {
    pub names: BTreeSet<ScriptName>,
    pub by_id: BTreeMap<ScriptId, ScriptName>,
    /// Descriptors that exist but could not be read, with the reason.
    /// Every claimant of a conflicting id is listed here too.
    pub unreadable: BTreeMap<ScriptName, String>,
    /// Remote ids claimed by more than one descriptor. Such ids are absent
    /// from `by_id`.
    pub conflicts: BTreeMap<ScriptId, Vec<ScriptName>>,
}

impl LocalIndex {
    pub fn name_for(&self, id: ScriptId) -> Option<&ScriptName> {
        self.by_id.get(&id)
    }

    /// Fail on the first id claimed by two descriptors.
    pub fn ensure_unique(&self) -> Result<(), LocalStateError> {
        for (id, names) in &self.conflicts {
            if let [first, second, ..] = names.as_slice() {
                return Err(LocalStateError::DuplicateId {
                    id: *id,
                    first: first.clone(),
                    second: second.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Scan every descriptor. Unreadable descriptors and ids claimed twice are
/// recorded rather than failing the scan; callers that need a consistent
/// id mapping check [`LocalIndex::ensure_unique`].
pub fn scan(layout: &ScriptLayout) -> Result<LocalIndex, LocalStateError> {
    let mut index = LocalIndex::default();
    for name in list_names(layout)? {
        match load_metadata(layout, &name) {
            Ok(ScriptMetadata { id: Some(id), .. }) => {
                if let Some(claimants) = index.conflicts.get_mut(&id) {
                    claimants.push(name.clone());
                } else if let Some(first) = index.by_id.remove(&id) {
                    index.conflicts.insert(id, vec![first, name.clone()]);
                } else {
                    index.by_id.insert(id, name.clone());
                }
            }
            Ok(_) => {}
            Err(err) => {
                index.unreadable.insert(name.clone(), err.to_string());
            }
        }
        index.names.insert(name);
    }

    for (id, claimants) in &index.conflicts {
        for name in claimants {
            let others: Vec<&str> = claimants
                .iter()
                .filter(|other| *other != name)
                .map(ScriptName::as_str)
                .collect();
            let reason = format!("remote id {id} is also claimed by '{}'", others.join("', '"));
            index.unreadable.insert(name.clone(), reason);
        }
    }
    Ok(index)
}

/// Find the local script name carrying remote id `id`.
pub fn find_by_id(layout: &ScriptLayout, id: ScriptId) -> Result<ScriptName, LocalStateError> {
    let mut index = scan(layout)?;
    index.ensure_unique()?;
    index.by_id.remove(&id).ok_or(LocalStateError::UnknownId { id })
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically write the descriptor for `name`.
///
/// Write flow: serialize → `<name>.toml.tmp` sibling → `rename`.
pub fn save_metadata(
    layout: &ScriptLayout,
    name: &ScriptName,
    metadata: &ScriptMetadata,
) -> Result<(), LocalStateError> {
    let text = toml::to_string(metadata).map_err(|source| LocalStateError::Serialize {
        name: name.clone(),
        source,
    })?;
    let path = layout.metadata_path(name);
    let tmp = path.with_file_name(format!("{}.{METADATA_EXTENSION}.tmp", name.0));
    replace_atomically(&path, &tmp, &text)
}

/// Atomically write the body file for `name`.
pub fn write_body(layout: &ScriptLayout, name: &ScriptName, body: &str) -> Result<(), LocalStateError> {
    let path = layout.script_path(name);
    let tmp = PathBuf::from(format!("{}.jast.tmp", path.display()));
    replace_atomically(&path, &tmp, body)
}

/// Scaffold an empty script and descriptor. Refuses to overwrite either file.
pub fn create_new(
    layout: &ScriptLayout,
    name: &ScriptName,
    metadata: ScriptMetadata,
) -> Result<LocalScript, LocalStateError> {
    for path in [layout.metadata_path(name), layout.script_path(name)] {
        if path.exists() {
            return Err(LocalStateError::AlreadyExists { path });
        }
    }

    let script = LocalScript {
        name: name.clone(),
        metadata,
        body: NEW_SCRIPT_TEMPLATE.to_string(),
    };
    save_metadata(layout, name, &script.metadata)?;
    write_body(layout, name, &script.body)?;
    Ok(script)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn read_existing(path: &Path) -> Result<String, LocalStateError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(LocalStateError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(io_err(path, err)),
    }
}

fn replace_atomically(path: &Path, tmp: &Path, content: &str) -> Result<(), LocalStateError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;
    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

fn relative_to(root: &Path, dir: &Path) -> PathBuf {
    let dir = dir.strip_prefix(root).unwrap_or(dir);
    normalize(dir)
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

//! Hash-gated writes of pulled scripts into the local mirror.
//!
//! Each file is compared by SHA-256 digest with what is already on disk and
//! only replaced when it differs. Replacement goes through the atomic helpers
//! in `jast_core::local` (`.tmp` sibling, then rename).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use jast_core::local;
use jast_core::{LocalScript, ScriptLayout};

use crate::compare::{metadata_text, normalize, sha256_hex};
use crate::error::{io_err, SyncError};

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// On-disk content already matches.
    Unchanged { path: PathBuf },
}

impl WriteResult {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteResult::Written { .. })
    }
}

/// Write body and descriptor of `script`, body first.
pub fn write_script(layout: &ScriptLayout, script: &LocalScript) -> Result<Vec<WriteResult>, SyncError> {
    let body_path = layout.script_path(&script.name);
    let wanted_digest = sha256_hex(&normalize(&script.body));
    let body = if digest_of_file(&body_path)?.as_deref() == Some(wanted_digest.as_str()) {
        tracing::debug!("unchanged: {}", body_path.display());
        WriteResult::Unchanged { path: body_path }
    } else {
        local::write_body(layout, &script.name, &script.body)?;
        tracing::info!("wrote: {}", body_path.display());
        WriteResult::Written { path: body_path }
    };

    let meta_path = layout.metadata_path(&script.name);
    let current = match local::load_metadata(layout, &script.name) {
        Ok(existing) => Some(metadata_text(&existing)),
        Err(_) => None,
    };
    let wanted = metadata_text(&script.metadata);
    let metadata = if current.as_deref() == Some(wanted.as_str()) {
        tracing::debug!("unchanged: {}", meta_path.display());
        WriteResult::Unchanged { path: meta_path }
    } else {
        local::save_metadata(layout, &script.name, &script.metadata)?;
        tracing::info!("wrote: {}", meta_path.display());
        WriteResult::Written { path: meta_path }
    };

    Ok(vec![body, metadata])
}

/// Digest of the normalised file content, `None` if the file is absent.
fn digest_of_file(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(sha256_hex(&normalize(&content)))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

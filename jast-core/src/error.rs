//! Error types for jast-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ScriptId, ScriptName};

/// Errors from reading or writing the local mirror.
#[derive(Debug, Error)]
pub enum LocalStateError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor exists but is not valid TOML for a script.
    #[error("failed to parse metadata at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Descriptor could not be serialized.
    #[error("failed to serialize metadata for '{name}': {source}")]
    Serialize {
        name: ScriptName,
        #[source]
        source: toml::ser::Error,
    },

    /// A descriptor or body file expected on disk is missing.
    #[error("no local file at {path}")]
    NotFound { path: PathBuf },

    /// Refused to scaffold over an existing file.
    #[error("{path} already exists")]
    AlreadyExists { path: PathBuf },

    /// Two descriptors claim the same remote id.
    #[error("remote id {id} is claimed by both '{first}' and '{second}'")]
    DuplicateId {
        id: ScriptId,
        first: ScriptName,
        second: ScriptName,
    },

    /// No descriptor carries the requested remote id.
    #[error("no local script carries remote id {id}")]
    UnknownId { id: ScriptId },

    /// A deleted script whose remote id cannot be found anywhere.
    #[error("cannot resolve a remote id for deleted script '{name}': no descriptor records one and no server script has that name")]
    NoRemoteId { name: ScriptName },
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A credential needed to reach the management server is unset.
    #[error("missing credential `{0}`; set it in the config file or via JAST_{1}")]
    MissingCredential(&'static str, &'static str),

    #[error("invalid configuration value for `{key}`: {reason}")]
    Invalid { key: String, reason: String },

    /// `dirs::config_dir()` returned `None`.
    #[error("cannot determine config directory; set JAST_CONFIG")]
    ConfigDirNotFound,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LocalStateError {
    LocalStateError::Io {
        path: path.into(),
        source,
    }
}

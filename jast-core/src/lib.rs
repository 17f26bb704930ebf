//! jast core library: domain types, the local script mirror, configuration.
//!
//! - [`types`]: newtypes and script structs
//! - [`local`]: descriptor/body load, save, scan
//! - [`config`]: [`Config`] loading and validation
//! - [`error`]: [`LocalStateError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod local;
pub mod types;

pub use config::{Config, HistoryPolicy};
pub use error::{ConfigError, LocalStateError};
pub use local::{ScriptLayout, TrackedPath};
pub use types::{LocalScript, Priority, RemoteScript, ScriptId, ScriptMetadata, ScriptName};

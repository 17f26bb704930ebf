//! Per-invocation setup shared by every command: config, repository root,
//! script layout and the server connection.

use std::path::PathBuf;

use anyhow::{Context, Result};

use jast_core::{Config, ScriptLayout};
use jast_git::Git;
use jast_remote::{ClientOptions, JamfClient};

pub struct Session {
    pub config: Config,
    pub root: PathBuf,
    pub layout: ScriptLayout,
}

impl Session {
    /// Load config and locate the repository containing the working
    /// directory. Outside a repository the working directory is the root.
    pub fn open() -> Result<Self> {
        let config = Config::load().context("failed to load configuration")?;
        let cwd = std::env::current_dir().context("could not determine working directory")?;
        let root = match Git::discover(&cwd) {
            Ok(repo) => repo.root().to_path_buf(),
            Err(err) => {
                tracing::debug!(error = %err, "not inside a git repository; using working directory");
                cwd
            }
        };
        let layout = config.layout(&root);
        Ok(Self {
            config,
            root,
            layout,
        })
    }

    /// Connect to the management server, failing early on missing credentials.
    pub fn connect(&self) -> Result<JamfClient> {
        self.config.require_remote()?;
        let options = ClientOptions::from_config(&self.config);
        let client = JamfClient::connect(&options)
            .with_context(|| format!("could not connect to {}", options.url))?;
        Ok(client)
    }

    pub fn repo(&self) -> Git {
        Git::open(&self.root)
    }
}

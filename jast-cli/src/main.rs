//! jast: keep management-server scripts in a git repository.
//!
//! # Usage
//!
//! ```text
//! jast scripts show
//! jast scripts pull [--force]
//! jast scripts push [--id <ids> | --file <paths>] [--dry-run]
//! jast scripts new --name <name> [--info ..] [--notes ..]
//! jast scripts status [--json]
//! jast scripts diff <name>
//! jast history new --id <id> --note <text>
//! jast hook pre-push [--soft-delete] [--dry-run]
//! jast hook install
//! jast config show|path|init
//! ```

mod commands;
mod context;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{config::ConfigCommand, history::HistoryCommand, hook::HookCommand, scripts::ScriptsCommand};
use jast_core::{ConfigError, LocalStateError};
use jast_git::GitError;
use jast_remote::RemoteError;
use jast_sync::{ErrorKind, SyncError};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "jast",
    version,
    about = "Mirror Jamf Pro scripts into git and push commits back",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect, pull, push and scaffold scripts.
    Scripts {
        #[command(subcommand)]
        command: ScriptsCommand,
    },

    /// Append entries to a script's server-side history.
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Version-control hook entry points.
    Hook {
        #[command(subcommand)]
        command: HookCommand,
    },

    /// Show or create the configuration file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scripts { command } => commands::scripts::run(command),
        Commands::History { command } => commands::history::run(command),
        Commands::Hook { command } => commands::hook::run(command),
        Commands::Config { command } => commands::config::run(command),
    }
}

/// Log to stderr so hook output and `--json` stay clean on stdout.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Process status for a failed command: the sysexits code of the first typed
/// error in the chain, or 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    let kind = err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<SyncError>() {
            Some(e.kind())
        } else if cause.is::<ConfigError>() {
            Some(ErrorKind::Configuration)
        } else if cause.is::<RemoteError>() {
            Some(ErrorKind::RemoteApi)
        } else if cause.is::<LocalStateError>() || cause.is::<GitError>() {
            Some(ErrorKind::LocalState)
        } else {
            None
        }
    });
    kind.map(|k| k.exit_code() as u8).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn sync_error_kind_survives_context() {
        let err = Err::<(), _>(SyncError::Configuration("no upstream".into()))
            .context("pre-push failed")
            .unwrap_err();
        assert_eq!(exit_code(&err), 78);
    }

    #[test]
    fn remote_error_maps_to_unavailable() {
        let err = anyhow::Error::new(RemoteError::Auth {
            user: "api".into(),
            status: 401,
        });
        assert_eq!(exit_code(&err), 69);
    }

    #[test]
    fn untyped_error_is_generic_failure() {
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

//! `jast scripts ...`

use anyhow::Result;
use clap::Subcommand;

use super::{diff::DiffArgs, new::NewArgs, pull::PullArgs, push::PushArgs, status::StatusArgs};

#[derive(Subcommand, Debug)]
pub enum ScriptsCommand {
    /// List scripts on the server.
    Show,
    /// Mirror server scripts into the repository.
    Pull(PullArgs),
    /// Push working-copy scripts to the server.
    Push(PushArgs),
    /// Scaffold a new script and descriptor.
    New(NewArgs),
    /// Compare the local mirror with the server.
    Status(StatusArgs),
    /// Show a unified diff of one script, local against server.
    Diff(DiffArgs),
}

pub fn run(command: ScriptsCommand) -> Result<()> {
    match command {
        ScriptsCommand::Show => super::show::run(),
        ScriptsCommand::Pull(args) => args.run(),
        ScriptsCommand::Push(args) => args.run(),
        ScriptsCommand::New(args) => args.run(),
        ScriptsCommand::Status(args) => args.run(),
        ScriptsCommand::Diff(args) => args.run(),
    }
}

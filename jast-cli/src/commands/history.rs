//! `jast history new`: append a free-form note to a script's history.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use jast_core::ScriptId;
use jast_remote::RemoteStore;

use crate::context::Session;

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Append a note.
    New(NewNoteArgs),
}

#[derive(Args, Debug)]
pub struct NewNoteArgs {
    /// Server id of the script.
    #[arg(long)]
    pub id: u64,

    #[arg(long)]
    pub note: String,
}

pub fn run(command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::New(args) => new_note(args),
    }
}

fn new_note(args: NewNoteArgs) -> Result<()> {
    if args.note.trim().is_empty() {
        anyhow::bail!("note must not be empty");
    }
    let session = Session::open()?;
    let client = session.connect()?;
    let id = ScriptId(args.id);
    client
        .append_history_note(id, args.note.trim())
        .with_context(|| format!("could not add history note to script {id}"))?;
    println!("✓ Added history note to script {id}");
    Ok(())
}

//! `jast scripts status`: local mirror against the server.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use jast_sync::{status, StatusEntry, SyncState};

use crate::context::Session;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open()?;
        let client = session.connect()?;
        let entries = status(&client, &session.layout).context("status check failed")?;

        if self.json {
            print_json(&entries)?;
        } else {
            print_table(&entries);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    in_sync: usize,
    needs_attention: usize,
    scripts: &'a [StatusEntry],
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "script")]
    script: String,
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "server name")]
    remote_name: String,
    #[tabled(rename = "status")]
    state: String,
}

fn print_json(entries: &[StatusEntry]) -> Result<()> {
    let in_sync = entries.iter().filter(|e| e.state == SyncState::InSync).count();
    let payload = StatusJson {
        in_sync,
        needs_attention: entries.len() - in_sync,
        scripts: entries,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(entries: &[StatusEntry]) {
    if entries.is_empty() {
        println!("No scripts locally or on the server.");
        return;
    }

    let rows: Vec<StatusRow> = entries
        .iter()
        .map(|e| StatusRow {
            script: e.name.to_string(),
            id: e.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            remote_name: e.remote_name.clone().unwrap_or_else(|| "-".to_string()),
            state: state_label(e.state),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let pending = entries.iter().filter(|e| e.state != SyncState::InSync).count();
    if pending > 0 {
        println!("{pending} scripts differ. Run 'jast scripts pull' or commit and push local changes.");
    }
}

fn state_label(state: SyncState) -> String {
    match state {
        SyncState::InSync => "in sync".green().to_string(),
        SyncState::Modified => "modified".yellow().to_string(),
        SyncState::LocalOnly => "local only".cyan().to_string(),
        SyncState::RemoteOnly => "server only".blue().to_string(),
        SyncState::Orphaned => "orphaned".magenta().to_string(),
        SyncState::Unreadable => "unreadable".red().to_string(),
        SyncState::Conflict => "name conflict".red().bold().to_string(),
    }
}

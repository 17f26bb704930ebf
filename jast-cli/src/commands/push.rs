//! `jast scripts push`: push working-copy scripts outside the hook.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use jast_core::ScriptId;
use jast_sync::{run_push, Action, PushReport, PushScope};

use crate::context::Session;

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Push scripts by server id (comma separated).
    #[arg(long, value_delimiter = ',', conflicts_with = "file")]
    pub id: Vec<u64>,

    /// Push scripts by body or descriptor path (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub file: Vec<PathBuf>,

    /// Show what would be pushed without contacting the server for changes.
    #[arg(long)]
    pub dry_run: bool,
}

impl PushArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open()?;
        let cwd = std::env::current_dir().context("could not determine working directory")?;
        let scope = if !self.id.is_empty() {
            PushScope::Ids(self.id.into_iter().map(ScriptId).collect())
        } else if !self.file.is_empty() {
            PushScope::Files(self.file.into_iter().map(|p| cwd.join(p)).collect())
        } else {
            PushScope::All
        };

        let client = session.connect()?;
        let report = run_push(&session.layout, &client, scope, self.dry_run).context("push failed")?;
        print_report(&report);
        Ok(())
    }
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "commit")]
    commit: String,
    #[tabled(rename = "script")]
    script: String,
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "action")]
    action: String,
}

/// Outcome table plus history-note summary. Shared with the pre-push hook.
pub fn print_report(report: &PushReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    if report.outcomes.is_empty() {
        println!("{prefix}✓ nothing to push");
        return;
    }

    let rows: Vec<OutcomeRow> = report
        .outcomes
        .iter()
        .map(|o| OutcomeRow {
            commit: o
                .commit
                .as_ref()
                .map(|c| c.short().to_string())
                .unwrap_or_else(|| "-".to_string()),
            script: o.name.to_string(),
            id: o.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            action: action_label(&o.action),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let changed = report.count(|a| !matches!(a, Action::Skipped(_)));
    println!("{prefix}✓ {changed} scripts pushed");

    let notes = &report.notes;
    if !notes.published.is_empty() || notes.duplicates > 0 {
        println!(
            "  history notes: {} appended, {} already recorded",
            notes.published.len(),
            notes.duplicates
        );
    }
    for failure in &notes.failures {
        println!(
            "  {} history note for {} at {} failed: {}",
            "!".yellow().bold(),
            failure.id,
            failure.commit.short(),
            failure.message
        );
    }
}

fn action_label(action: &Action) -> String {
    match action {
        Action::Created => "created".green().to_string(),
        Action::Updated => "updated".cyan().to_string(),
        Action::Deleted => "deleted".red().to_string(),
        Action::Deactivated => "deactivated".magenta().to_string(),
        Action::Skipped(why) => format!("skipped ({why})").bright_black().to_string(),
    }
}

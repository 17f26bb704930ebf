//! `jast scripts pull`: mirror server scripts locally.

use std::io;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use jast_sync::collision::PullOutcome;
use jast_sync::{pull, PullAction, PullReport};

use super::prompt::PromptDecider;
use crate::context::Session;

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Overwrite differing local scripts without asking.
    #[arg(long)]
    pub force: bool,
}

impl PullArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open()?;
        let client = session.connect()?;

        let stdin = io::stdin();
        let mut decider = PromptDecider::new(stdin.lock(), io::stdout(), session.layout.clone());
        let report = pull(&client, &session.layout, self.force, &mut decider).context("pull failed")?;

        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &PullReport) {
    if report.outcomes.is_empty() {
        println!("No scripts on the server.");
        return;
    }
    for outcome in &report.outcomes {
        println!("  {}", describe(outcome));
    }
    println!(
        "✓ pulled {} scripts ({} new, {} overwritten, {} unchanged, {} skipped)",
        report.outcomes.len(),
        report.count(&PullAction::Created),
        report.count(&PullAction::Overwritten),
        report.count(&PullAction::Unchanged),
        report.outcomes.len()
            - report.count(&PullAction::Created)
            - report.count(&PullAction::Overwritten)
            - report.count(&PullAction::Unchanged),
    );
}

fn describe(outcome: &PullOutcome) -> String {
    let PullOutcome { id, name, action } = outcome;
    match action {
        PullAction::Created => format!("{} {name} ({id})", "+".green()),
        PullAction::Overwritten => format!("{} {name} ({id})", "✎".yellow()),
        PullAction::Unchanged => format!("{} {name} ({id})", "·".bright_black()),
        PullAction::Skipped => format!("{} {name} ({id}) kept local copy", "-".bright_black()),
        PullAction::NameTaken { other } => format!(
            "{} {name} ({id}) skipped: name already bound to {other}",
            "!".red().bold()
        ),
    }
}

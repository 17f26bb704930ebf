//! `jast scripts diff <name>`: unified diff of one script, local against server.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use jast_core::ScriptName;
use jast_sync::{diff_script, ScriptDiff};

use crate::context::Session;

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Script name (file stem).
    pub name: String,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open()?;
        let client = session.connect()?;
        let name = ScriptName::from(self.name);

        let diff = diff_script(&client, &session.layout, &name)
            .with_context(|| format!("diff failed for '{name}'"))?;
        if diff.is_empty() {
            println!("No differences for '{name}'.");
            return Ok(());
        }
        print!("{}", render(&diff));
        Ok(())
    }
}

/// Body diff followed by descriptor diff, coloured by line.
pub fn render(diff: &ScriptDiff) -> String {
    let mut out = String::new();
    for part in [&diff.body, &diff.metadata] {
        if part.is_empty() {
            continue;
        }
        for line in part.lines() {
            let painted = if line.starts_with("+++") || line.starts_with("---") {
                line.bold().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else if line.starts_with("@@") {
                line.cyan().to_string()
            } else {
                line.to_string()
            };
            out.push_str(&painted);
            out.push('\n');
        }
    }
    out
}

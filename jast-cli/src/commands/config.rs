//! `jast config show|path|init`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use jast_core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration, password masked.
    Show,
    /// Print the config file location.
    Path,
    /// Write a default config file.
    Init(InitArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Replace an existing file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "key")]
    key: String,
    #[tabled(rename = "value")]
    value: String,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => show(),
        ConfigCommand::Path => {
            println!("{}", Config::default_path()?.display());
            Ok(())
        }
        ConfigCommand::Init(args) => init(args),
    }
}

fn show() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let rows: Vec<EntryRow> = config
        .display_entries()
        .into_iter()
        .map(|(key, value)| EntryRow { key, value })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn init(args: InitArgs) -> Result<()> {
    let path = Config::default_path()?;
    if path.exists() && !args.force {
        anyhow::bail!("{} already exists; pass --force to replace it", path.display());
    }
    Config::default()
        .save_at(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("✓ Wrote {}", path.display());
    println!("Fill in [jamf] url, user and password, or set JAST_JAMF__* variables.");
    Ok(())
}

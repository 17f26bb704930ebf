//! `jast scripts show`: table of server scripts.

use anyhow::{Context, Result};
use tabled::{settings::Style, Table, Tabled};

use jast_remote::RemoteStore;

use crate::context::Session;

#[derive(Tabled)]
struct ScriptRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "category")]
    category: String,
    #[tabled(rename = "priority")]
    priority: String,
    #[tabled(rename = "info")]
    info: String,
}

pub fn run() -> Result<()> {
    let session = Session::open()?;
    let client = session.connect()?;
    let mut scripts = client.list().context("failed to list scripts")?;
    if scripts.is_empty() {
        println!("No scripts on the server.");
        return Ok(());
    }
    scripts.sort_by_key(|s| s.id);

    let rows: Vec<ScriptRow> = scripts
        .into_iter()
        .map(|s| ScriptRow {
            id: s.id.0,
            name: s.name,
            category: s.metadata.category_name,
            priority: s.metadata.priority.to_string(),
            info: truncate(&s.metadata.info, 48),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max {
        return line.to_string();
    }
    let cut: String = line.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

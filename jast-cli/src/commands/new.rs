//! `jast scripts new`: scaffold a script body and descriptor.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use jast_core::local::create_new;
use jast_core::{Priority, ScriptMetadata, ScriptName};

use crate::context::Session;

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Script name; becomes the file stem.
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub info: String,

    #[arg(long, default_value = "")]
    pub notes: String,

    /// Category name as shown on the server.
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, value_enum, default_value_t = PriorityArg::After)]
    pub priority: PriorityArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    Before,
    After,
    AtReboot,
}

impl From<PriorityArg> for Priority {
    fn from(p: PriorityArg) -> Self {
        match p {
            PriorityArg::Before => Priority::Before,
            PriorityArg::After => Priority::After,
            PriorityArg::AtReboot => Priority::AtReboot,
        }
    }
}

impl NewArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open()?;
        let name = ScriptName::from(self.name.trim());
        if name.as_str().is_empty() || name.as_str().contains(&['/', '\\'][..]) {
            anyhow::bail!("'{}' is not a valid script name", self.name);
        }

        let mut metadata = ScriptMetadata {
            info: self.info,
            notes: self.notes,
            priority: self.priority.into(),
            ..ScriptMetadata::default()
        };
        if let Some(category) = self.category {
            metadata.category_name = category;
        }

        create_new(&session.layout, &name, metadata)
            .with_context(|| format!("could not create '{name}'"))?;
        println!("✓ Created '{name}'");
        println!("  {}", session.layout.relative_script_path(&name).display());
        println!("  {}", session.layout.relative_metadata_path(&name).display());
        println!("Commit both files; the next push creates it on the server.");
        Ok(())
    }
}

//! Interactive overwrite/skip decisions for `jast scripts pull`.

use std::io::{BufRead, Write};

use colored::Colorize;

use jast_core::ScriptLayout;
use jast_sync::compare::diff_scripts;
use jast_sync::{Collision, CollisionDecider, CollisionReason, Decision};

use super::diff::render;

/// Shows the diff, then reads a `y/N` answer. Anything but yes skips,
/// including end of input and read errors.
pub struct PromptDecider<R, W> {
    input: R,
    output: W,
    layout: ScriptLayout,
}

impl<R: BufRead, W: Write> PromptDecider<R, W> {
    pub fn new(input: R, output: W, layout: ScriptLayout) -> Self {
        Self {
            input,
            output,
            layout,
        }
    }

    fn ask(&mut self, collision: &Collision<'_>) -> std::io::Result<Decision> {
        match (collision.local, collision.reason) {
            (Some(local), _) => {
                let diff = diff_scripts(&self.layout, local, collision.remote);
                write!(self.output, "{}", render(&diff))?;
            }
            (None, CollisionReason::UnreadableLocal(why)) => {
                writeln!(self.output, "{} local copy is unreadable: {why}", "!".yellow().bold())?;
            }
            (None, CollisionReason::ContentDiffers) => {}
        }
        write!(
            self.output,
            "Overwrite local '{}' with server script {}? [y/N] ",
            collision.name, collision.remote.id
        )?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Decision::Overwrite,
            _ => Decision::Skip,
        })
    }
}

impl<R: BufRead, W: Write> CollisionDecider for PromptDecider<R, W> {
    fn decide(&mut self, collision: &Collision<'_>) -> Decision {
        self.ask(collision).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not read answer; skipping");
            Decision::Skip
        })
    }
}

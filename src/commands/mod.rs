pub mod chain;
pub mod context;
pub mod tree;

use anyhow::{Context, Result};
use taskwarrior_enhanced::graph::Task;
use taskwarrior_enhanced::style::{Painter, RenderedLine};
use taskwarrior_enhanced::taskwarrior::TaskSource;

/// Printed instead of an empty tree or chain
pub const NO_TASKS: &str = "No pending tasks found.";

/// How command results reach stdout
pub struct Output {
    pub json: bool,
    pub painter: Box<dyn Painter>,
}

impl Output {
    /// Print rendered lines, or `empty_notice` when there are none.
    pub fn print_lines(&self, lines: &[RenderedLine], empty_notice: &str) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(lines)?);
        } else if lines.is_empty() {
            println!("{}", empty_notice);
        } else {
            for line in lines {
                println!("{}", self.painter.paint(line));
            }
        }
        Ok(())
    }
}

/// Export tasks with status tag `status` (e.g. `+PENDING`), then the
/// context arguments, then user filters.
pub fn export_tasks(
    source: &dyn TaskSource,
    status: &str,
    context_args: &[String],
    filters: &[String],
) -> Result<Vec<Task>> {
    let mut args = Vec::with_capacity(1 + context_args.len() + filters.len());
    args.push(status.to_string());
    args.extend_from_slice(context_args);
    args.extend_from_slice(filters);
    source
        .export(&args)
        .with_context(|| format!("Failed to export {} tasks", status))
}

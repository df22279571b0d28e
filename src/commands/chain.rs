use anyhow::Result;
use chrono::{DateTime, Utc};
use taskwarrior_enhanced::chain::{ChainRenderer, select_task};
use taskwarrior_enhanced::graph::{DependencyGraph, TaskSet};
use taskwarrior_enhanced::style::RenderedLine;
use taskwarrior_enhanced::taskwarrior::TaskSource;

use super::{NO_TASKS, Output, export_tasks};

pub fn run(source: &dyn TaskSource, key: &str, output: &Output) -> Result<()> {
    let lines = build_lines(source, key, Utc::now())?;
    output.print_lines(&lines, NO_TASKS)
}

/// Render `key`'s ancestor chain. The context is not applied, so dependents
/// outside it still show up.
pub fn build_lines(
    source: &dyn TaskSource,
    key: &str,
    now: DateTime<Utc>,
) -> Result<Vec<RenderedLine>> {
    let pending = export_tasks(source, "+PENDING", &[], &[])?;
    let tasks = TaskSet::from_exports(pending, Vec::new());
    let start = select_task(&tasks, key)?;
    let graph = DependencyGraph::build(&tasks);
    Ok(ChainRenderer::new(&tasks, &graph, now).render(start))
}

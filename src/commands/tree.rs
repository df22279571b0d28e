use anyhow::Result;
use chrono::{DateTime, Utc};
use taskwarrior_enhanced::context::ResolvedContext;
use taskwarrior_enhanced::graph::{DependencyGraph, TaskSet};
use taskwarrior_enhanced::style::RenderedLine;
use taskwarrior_enhanced::taskwarrior::TaskSource;
use taskwarrior_enhanced::tree::TreeRenderer;

use super::{NO_TASKS, Output, export_tasks};

/// Rendered forest plus the number of tasks it was built from
pub struct TreeView {
    pub task_count: usize,
    pub lines: Vec<RenderedLine>,
}

impl TreeView {
    /// What to print when no line was rendered. Tasks exist but none is a
    /// root when every one of them sits in a dependency cycle.
    pub fn empty_notice(&self) -> String {
        if self.task_count == 0 {
            NO_TASKS.to_string()
        } else {
            format!(
                "No root tasks: all {} pending tasks are in dependency cycles.",
                self.task_count
            )
        }
    }
}

pub fn run(
    source: &dyn TaskSource,
    context: &ResolvedContext,
    filters: &[String],
    annotate_parents: bool,
    output: &Output,
) -> Result<()> {
    let view = build_view(source, context, filters, annotate_parents, Utc::now())?;
    output.print_lines(&view.lines, &view.empty_notice())
}

/// Fetch pending and waiting tasks under the active context and render the
/// forward dependency forest.
pub fn build_view(
    source: &dyn TaskSource,
    context: &ResolvedContext,
    filters: &[String],
    annotate_parents: bool,
    now: DateTime<Utc>,
) -> Result<TreeView> {
    let context_args = context.filter_args();
    let pending = export_tasks(source, "+PENDING", &context_args, filters)?;
    let waiting = export_tasks(source, "+WAITING", &context_args, filters)?;

    let tasks = TaskSet::from_exports(pending, waiting);
    if tasks.is_empty() {
        return Ok(TreeView {
            task_count: 0,
            lines: Vec::new(),
        });
    }
    let graph = DependencyGraph::build(&tasks);

    for cycle in graph.cycles() {
        let ids: Vec<String> = cycle.iter().map(|uuid| tasks.display_id(uuid)).collect();
        tracing::warn!("Dependency cycle between tasks {}", ids.join(", "));
    }

    let lines = TreeRenderer::new(&tasks, &graph, now)
        .annotate_parents(annotate_parents)
        .render();
    Ok(TreeView {
        task_count: tasks.len(),
        lines,
    })
}

//! Forward dependency forest
//!
//! Every root is printed with the tasks it depends on beneath it. A task
//! reachable along several paths is expanded once, at its first visit.

use crate::graph::{DependencyGraph, TaskSet};
use crate::style::{RenderedLine, classify};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub(crate) const BRANCH: &str = "├── ";
pub(crate) const LAST_BRANCH: &str = "└── ";
pub(crate) const PIPE: &str = "│   ";
pub(crate) const SPACE: &str = "    ";

pub struct TreeRenderer<'a> {
    tasks: &'a TaskSet,
    graph: &'a DependencyGraph,
    now: DateTime<Utc>,
    annotate_parents: bool,
}

/// A node whose children are being walked
struct Frame<'a> {
    uuid: &'a str,
    children: &'a [String],
    next: usize,
    child_prefix: String,
}

impl<'a> TreeRenderer<'a> {
    pub fn new(tasks: &'a TaskSet, graph: &'a DependencyGraph, now: DateTime<Utc>) -> Self {
        Self {
            tasks,
            graph,
            now,
            annotate_parents: true,
        }
    }

    /// Whether printed tasks list their other dependents
    pub fn annotate_parents(mut self, annotate: bool) -> Self {
        self.annotate_parents = annotate;
        self
    }

    pub fn render(&self) -> Vec<RenderedLine> {
        let mut lines = Vec::new();
        let mut visited: HashSet<&'a str> = HashSet::new();
        let roots = self.graph.roots();

        for (i, root) in roots.iter().enumerate() {
            if visited.contains(root.as_str()) {
                continue;
            }
            self.walk(root, i + 1 == roots.len(), &mut visited, &mut lines);
        }

        let expanded = visited.len();
        if expanded < self.tasks.len() {
            tracing::debug!(
                unreachable = self.tasks.len() - expanded,
                "tasks not reachable from any root (dependency cycle)"
            );
        }
        lines
    }

    fn walk(
        &self,
        root: &'a str,
        is_last: bool,
        visited: &mut HashSet<&'a str>,
        lines: &mut Vec<RenderedLine>,
    ) {
        let mut stack: Vec<Frame<'a>> = Vec::new();
        if let Some(frame) = self.visit(root, None, "", is_last, 0, visited, lines) {
            stack.push(frame);
        }

        while let Some(frame) = stack.last_mut() {
            if frame.next >= frame.children.len() {
                stack.pop();
                continue;
            }
            let index = frame.next;
            frame.next += 1;

            let children = frame.children;
            let child = children[index].as_str();
            if visited.contains(child) {
                continue;
            }
            let is_last = index + 1 == children.len();
            let parent = frame.uuid;
            let prefix = frame.child_prefix.clone();
            let depth = stack.len();

            if let Some(next) = self.visit(child, Some(parent), &prefix, is_last, depth, visited, lines)
            {
                stack.push(next);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn visit(
        &self,
        uuid: &'a str,
        parent: Option<&str>,
        prefix: &str,
        is_last: bool,
        depth: usize,
        visited: &mut HashSet<&'a str>,
        lines: &mut Vec<RenderedLine>,
    ) -> Option<Frame<'a>> {
        let task = self.tasks.get(uuid)?;
        visited.insert(uuid);

        let also_blocks = if self.annotate_parents {
            self.graph
                .parents(uuid)
                .iter()
                .filter(|p| Some(p.as_str()) != parent)
                .map(|p| self.tasks.display_id(p))
                .collect()
        } else {
            Vec::new()
        };

        lines.push(RenderedLine {
            prefix: prefix.to_string(),
            connector: if is_last { LAST_BRANCH } else { BRANCH }.to_string(),
            depth,
            id: task.display_id(),
            uuid: task.uuid.clone(),
            description: task.description.clone(),
            also_blocks,
            style: classify(task, self.tasks.is_waiting(uuid), self.now),
        });

        Some(Frame {
            uuid,
            children: self.graph.children(uuid),
            next: 0,
            child_prefix: format!("{}{}", prefix, if is_last { SPACE } else { PIPE }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Task;
    use crate::style::TaskStyle;
    use crate::test_helpers::{make_task, with_deps, with_priority};

    fn render(tasks: Vec<Task>) -> Vec<RenderedLine> {
        let set = TaskSet::from_exports(tasks, vec![]);
        let graph = DependencyGraph::build(&set);
        TreeRenderer::new(&set, &graph, Utc::now()).render()
    }

    fn texts(lines: &[RenderedLine]) -> Vec<String> {
        lines.iter().map(RenderedLine::text).collect()
    }

    #[test]
    fn test_single_task() {
        let lines = render(vec![make_task("a", 1, "Alone")]);
        assert_eq!(texts(&lines), vec!["└── 1 Alone"]);
    }

    #[test]
    fn test_nested_connectors() {
        let lines = render(vec![
            with_deps(make_task("top", 1, "Top"), &["mid", "side"]),
            with_deps(make_task("mid", 2, "Mid"), &["leaf"]),
            make_task("side", 3, "Side"),
            make_task("leaf", 4, "Leaf"),
            make_task("other", 5, "Other"),
        ]);

        assert_eq!(
            texts(&lines),
            vec![
                "├── 1 Top",
                "│   ├── 2 Mid",
                "│   │   └── 4 Leaf",
                "│   └── 3 Side",
                "└── 5 Other",
            ]
        );
        assert_eq!(lines[0].depth, 0);
        assert_eq!(lines[2].depth, 2);
    }

    #[test]
    fn test_diamond_printed_once_and_annotated() {
        // a and c both depend on b
        let lines = render(vec![
            with_priority(with_deps(make_task("a", 1, "A"), &["b"]), "L", 0.0),
            make_task("b", 2, "B"),
            with_priority(with_deps(make_task("c", 3, "C"), &["b"]), "H", 0.0),
        ]);

        assert_eq!(
            texts(&lines),
            vec!["├── 1 A", "│   └── 2 B [also blocks 3]", "└── 3 C"]
        );
        assert_eq!(lines.iter().filter(|l| l.uuid == "b").count(), 1);
    }

    #[test]
    fn test_shared_subtree_expanded_once() {
        let lines = render(vec![
            with_deps(make_task("a", 1, "A"), &["b"]),
            with_deps(make_task("c", 3, "C"), &["b"]),
            with_deps(make_task("b", 2, "B"), &["d"]),
            make_task("d", 4, "D"),
        ]);

        let uuids: Vec<&str> = lines.iter().map(|l| l.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_annotation_can_be_disabled() {
        let set = TaskSet::from_exports(
            vec![
                with_deps(make_task("a", 1, "A"), &["b"]),
                make_task("b", 2, "B"),
                with_deps(make_task("c", 3, "C"), &["b"]),
            ],
            vec![],
        );
        let graph = DependencyGraph::build(&set);
        let lines = TreeRenderer::new(&set, &graph, Utc::now())
            .annotate_parents(false)
            .render();
        assert!(lines.iter().all(|l| l.also_blocks.is_empty()));
    }

    #[test]
    fn test_cycle_below_root_terminates() {
        let lines = render(vec![
            with_deps(make_task("r", 1, "Root"), &["x"]),
            with_deps(make_task("x", 2, "X"), &["y"]),
            with_deps(make_task("y", 3, "Y"), &["x"]),
        ]);
        let uuids: Vec<&str> = lines.iter().map(|l| l.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["r", "x", "y"]);
    }

    #[test]
    fn test_pure_cycle_has_no_roots() {
        let lines = render(vec![
            with_deps(make_task("x", 1, "X"), &["y"]),
            with_deps(make_task("y", 2, "Y"), &["x"]),
        ]);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_waiting_style() {
        let mut set = TaskSet::new();
        set.insert(with_deps(make_task("a", 1, "A"), &["w"]));
        set.insert(make_task("w", 2, "Waiting on vendor"));
        set.mark_waiting("w");
        let graph = DependencyGraph::build(&set);

        let lines = TreeRenderer::new(&set, &graph, Utc::now()).render();
        assert_eq!(lines[0].style, TaskStyle::Plain);
        assert_eq!(lines[1].style, TaskStyle::Waiting);
    }

    #[test]
    fn test_missing_id_uses_sentinel() {
        let mut task = make_task("a", 1, "No id");
        task.id = None;
        let lines = render(vec![task]);
        assert_eq!(texts(&lines), vec!["└── ? No id"]);
    }
}

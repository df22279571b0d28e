//! Ancestor chain of one task
//!
//! Walks upward from a task through everything that depends on it. Unlike
//! the forward tree, an ancestor reached through two branches is printed in
//! both; only a task already on the current branch stops the walk.

use crate::graph::{DependencyGraph, Task, TaskSet};
use crate::style::{RenderedLine, classify};
use crate::tree::{BRANCH, LAST_BRANCH, PIPE, SPACE};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

/// Shortest uuid prefix accepted for lookup
const MIN_UUID_PREFIX: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Task '{0}' not found among pending tasks")]
    NotFound(String),
    #[error("'{key}' matches several tasks: {}", .candidates.join(", "))]
    Ambiguous { key: String, candidates: Vec<String> },
}

/// Find the task a user referred to: display id first, then uuid, then an
/// unambiguous uuid prefix.
pub fn select_task<'a>(tasks: &'a TaskSet, key: &str) -> Result<&'a Task, ChainError> {
    let key = key.trim();
    if let Ok(id) = key.parse::<u64>()
        && let Some(task) = tasks.find_by_id(id)
    {
        return Ok(task);
    }
    if let Some(task) = tasks.get(key) {
        return Ok(task);
    }
    if key.len() >= MIN_UUID_PREFIX {
        let matches = tasks.find_by_uuid_prefix(key);
        match matches.len() {
            0 => {}
            1 => return Ok(matches[0]),
            _ => {
                return Err(ChainError::Ambiguous {
                    key: key.to_string(),
                    candidates: matches.iter().map(|t| t.display_id()).collect(),
                });
            }
        }
    }
    Err(ChainError::NotFound(key.to_string()))
}

pub struct ChainRenderer<'a> {
    tasks: &'a TaskSet,
    graph: &'a DependencyGraph,
    now: DateTime<Utc>,
}

/// A node whose dependents are being walked, with the branch leading to it
struct Frame<'a> {
    parents: &'a [String],
    next: usize,
    prefix: String,
    path: HashSet<&'a str>,
}

impl<'a> ChainRenderer<'a> {
    pub fn new(tasks: &'a TaskSet, graph: &'a DependencyGraph, now: DateTime<Utc>) -> Self {
        Self { tasks, graph, now }
    }

    /// Render `start` followed by its dependents, recursively.
    pub fn render(&self, start: &'a Task) -> Vec<RenderedLine> {
        let mut lines = vec![self.line(start, String::new(), "", 0)];

        let mut stack = vec![Frame {
            parents: self.graph.parents(&start.uuid),
            next: 0,
            prefix: String::new(),
            path: HashSet::from([start.uuid.as_str()]),
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.next >= frame.parents.len() {
                stack.pop();
                continue;
            }
            let index = frame.next;
            frame.next += 1;

            let parents = frame.parents;
            let uuid = parents[index].as_str();
            if frame.path.contains(uuid) {
                tracing::debug!(task = %uuid, "dependency cycle, stopping this branch");
                continue;
            }
            let Some(task) = self.tasks.get(uuid) else {
                continue;
            };

            // One dependent continues the chain in a straight line; two or
            // more fork it
            let branching = parents.len() > 1;
            let is_last = index + 1 == parents.len();
            let (connector, child_prefix) = if branching {
                let continuation = if is_last { SPACE } else { PIPE };
                (
                    if is_last { LAST_BRANCH } else { BRANCH },
                    format!("{}{}", frame.prefix, continuation),
                )
            } else {
                ("", frame.prefix.clone())
            };

            let line_prefix = frame.prefix.clone();
            let mut path = frame.path.clone();
            path.insert(uuid);
            let depth = stack.len();
            lines.push(self.line(task, line_prefix, connector, depth));

            stack.push(Frame {
                parents: self.graph.parents(uuid),
                next: 0,
                prefix: child_prefix,
                path,
            });
        }

        lines
    }

    fn line(&self, task: &Task, prefix: String, connector: &str, depth: usize) -> RenderedLine {
        RenderedLine {
            prefix,
            connector: connector.to_string(),
            depth,
            id: task.display_id(),
            uuid: task.uuid.clone(),
            description: task.description.clone(),
            also_blocks: Vec::new(),
            style: classify(task, false, self.now),
        }
    }
}

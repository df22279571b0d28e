use chrono::{DateTime, Utc};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Task priority as exported by Taskwarrior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    High,
    Medium,
    Low,
    #[default]
    None,
    /// A value outside H/M/L (user-defined UDA values)
    Other(String),
}

impl Priority {
    pub fn parse(value: &str) -> Self {
        match value {
            "H" => Priority::High,
            "M" => Priority::Medium,
            "L" => Priority::Low,
            "" => Priority::None,
            other => Priority::Other(other.to_string()),
        }
    }

    /// Sort rank: H=4, M=3, L=2, none=1, anything else 0.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 4,
            Priority::Medium => 3,
            Priority::Low => 2,
            Priority::None => 1,
            Priority::Other(_) => 0,
        }
    }
}

/// A task record from a Taskwarrior export
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Task {
    /// Working-set id; unstable, only used for display
    pub id: Option<u64>,
    pub uuid: String,
    pub description: String,
    pub priority: Priority,
    pub urgency: f64,
    pub due: Option<DateTime<Utc>>,
    /// The task has a `start` timestamp
    pub active: bool,
    pub depends: Vec<String>,
}

impl Task {
    /// The id shown to users, `?` when the export carried none.
    pub fn display_id(&self) -> String {
        self.id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string())
    }

    pub fn sort_key(&self) -> (u8, f64) {
        (self.priority.rank(), self.urgency)
    }
}

fn compare_keys(a: (u8, f64), b: (u8, f64)) -> Ordering {
    a.0.cmp(&b.0).then(a.1.total_cmp(&b.1))
}

/// The fetched task set, keyed by uuid and kept in export order.
///
/// Built from the pending export followed by the waiting export; a uuid seen
/// twice keeps its first record.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    waiting: HashSet<String>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_exports(pending: Vec<Task>, waiting: Vec<Task>) -> Self {
        let mut set = Self::new();
        for task in pending {
            set.insert(task);
        }
        for task in waiting {
            let uuid = task.uuid.clone();
            if set.insert(task) {
                set.waiting.insert(uuid);
            }
        }
        set
    }

    /// Insert a task. Returns false if the uuid is already present.
    pub fn insert(&mut self, task: Task) -> bool {
        if self.index.contains_key(&task.uuid) {
            return false;
        }
        self.index.insert(task.uuid.clone(), self.tasks.len());
        self.tasks.push(task);
        true
    }

    #[cfg(test)]
    pub(crate) fn mark_waiting(&mut self, uuid: &str) {
        self.waiting.insert(uuid.to_string());
    }

    pub fn is_waiting(&self, uuid: &str) -> bool {
        self.waiting.contains(uuid)
    }

    pub fn get(&self, uuid: &str) -> Option<&Task> {
        self.index.get(uuid).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.index.contains_key(uuid)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == Some(id))
    }

    /// Tasks whose uuid starts with `prefix`
    pub fn find_by_uuid_prefix(&self, prefix: &str) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.uuid.starts_with(prefix))
            .collect()
    }

    /// Display id for a uuid, `?` if unknown.
    pub fn display_id(&self, uuid: &str) -> String {
        self.get(uuid)
            .map(Task::display_id)
            .unwrap_or_else(|| "?".to_string())
    }

    /// Sort uuids ascending by `(priority rank, urgency)`. The sort is stable.
    pub fn sort_by_priority(&self, uuids: &mut [String]) {
        uuids.sort_by(|a, b| {
            let ka = self.get(a).map(Task::sort_key).unwrap_or((0, 0.0));
            let kb = self.get(b).map(Task::sort_key).unwrap_or((0, 0.0));
            compare_keys(ka, kb)
        });
    }
}

/// Dependency adjacency derived from a task set.
///
/// `children[x]` are the tasks x depends on, `parents[x]` the tasks that
/// depend on x. Only edges whose endpoints are both in the set exist.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    children: HashMap<String, Vec<String>>,
    parents: HashMap<String, Vec<String>>,
    roots: Vec<String>,
}

impl DependencyGraph {
    pub fn build(tasks: &TaskSet) -> Self {
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut parents: HashMap<String, Vec<String>> = HashMap::new();

        for task in tasks.tasks() {
            for dep in &task.depends {
                if !tasks.contains(dep) {
                    tracing::debug!(task = %task.uuid, dependency = %dep, "dropping edge to task outside the fetched set");
                    continue;
                }
                let deps = children.entry(task.uuid.clone()).or_default();
                if deps.contains(dep) {
                    continue;
                }
                deps.push(dep.clone());
                parents
                    .entry(dep.clone())
                    .or_default()
                    .push(task.uuid.clone());
            }
        }

        for list in children.values_mut() {
            tasks.sort_by_priority(list);
        }
        for list in parents.values_mut() {
            tasks.sort_by_priority(list);
        }

        let mut roots: Vec<String> = tasks
            .tasks()
            .filter(|t| !parents.contains_key(&t.uuid))
            .map(|t| t.uuid.clone())
            .collect();
        tasks.sort_by_priority(&mut roots);

        Self {
            children,
            parents,
            roots,
        }
    }

    pub fn children(&self, uuid: &str) -> &[String] {
        self.children.get(uuid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parents(&self, uuid: &str) -> &[String] {
        self.parents.get(uuid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tasks nothing depends on, sorted by priority then urgency.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    #[cfg(test)]
    pub(crate) fn edge_count(&self) -> usize {
        self.children.values().map(Vec::len).sum()
    }

    /// Groups of tasks that depend on each other in a loop, including
    /// tasks that depend on themselves.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (from, deps) in &self.children {
            for to in deps {
                graph.add_edge(from.as_str(), to.as_str(), ());
            }
        }

        tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut ids: Vec<String> = scc.into_iter().map(str::to_string).collect();
                ids.sort();
                ids
            })
            .collect()
    }
}

use crate::graph::{Priority, Task};

/// Create a task with the given uuid, display id and description, with all
/// other fields defaulted.
pub fn make_task(uuid: &str, id: u64, description: &str) -> Task {
    Task {
        id: Some(id),
        uuid: uuid.to_string(),
        description: description.to_string(),
        ..Task::default()
    }
}

pub fn with_deps(mut task: Task, deps: &[&str]) -> Task {
    task.depends = deps.iter().map(|d| d.to_string()).collect();
    task
}

pub fn with_priority(mut task: Task, priority: &str, urgency: f64) -> Task {
    task.priority = Priority::parse(priority);
    task.urgency = urgency;
    task
}

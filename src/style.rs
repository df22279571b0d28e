//! Presentation of rendered task lines
//!
//! Renderers produce [`RenderedLine`]s carrying a [`TaskStyle`]; a
//! [`Painter`] turns them into terminal text.

use crate::graph::{Priority, Task};
use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use serde::Serialize;

/// Where a task's due date falls relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue,
    DueToday,
    NotDue,
}

/// Overdue when strictly before `now`, due today when inside the current
/// UTC calendar day.
pub fn due_status(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DueStatus {
    let Some(due) = due else {
        return DueStatus::NotDue;
    };
    if due < now {
        return DueStatus::Overdue;
    }
    let Some(start_of_day) = now.date_naive().and_hms_opt(0, 0, 0) else {
        return DueStatus::NotDue;
    };
    let start_of_day = start_of_day.and_utc();
    let end_of_day = start_of_day + Duration::days(1);
    if due >= start_of_day && due < end_of_day {
        DueStatus::DueToday
    } else {
        DueStatus::NotDue
    }
}

/// Style class of one rendered line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStyle {
    Active,
    Overdue,
    DueToday,
    Waiting,
    LowPriority,
    HighPriority,
    Plain,
}

/// Classify a task. Precedence: active, then overdue/due today, then
/// waiting/low priority, then high priority.
pub fn classify(task: &Task, waiting: bool, now: DateTime<Utc>) -> TaskStyle {
    if task.active {
        return TaskStyle::Active;
    }
    match due_status(task.due, now) {
        DueStatus::Overdue => return TaskStyle::Overdue,
        DueStatus::DueToday => return TaskStyle::DueToday,
        DueStatus::NotDue => {}
    }
    if waiting {
        return TaskStyle::Waiting;
    }
    match task.priority {
        Priority::Low => TaskStyle::LowPriority,
        Priority::High => TaskStyle::HighPriority,
        _ => TaskStyle::Plain,
    }
}

/// One line of tree or chain output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedLine {
    /// Indentation columns inherited from ancestors (`│   ` / `    `)
    pub prefix: String,
    /// `├── `, `└── ` or empty
    pub connector: String,
    pub depth: usize,
    pub id: String,
    pub uuid: String,
    pub description: String,
    /// Display ids of further tasks depending on this one
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub also_blocks: Vec<String>,
    pub style: TaskStyle,
}

impl RenderedLine {
    pub fn text(&self) -> String {
        let mut text = format!(
            "{}{}{} {}",
            self.prefix, self.connector, self.id, self.description
        );
        if !self.also_blocks.is_empty() {
            text.push_str(&format!(" [also blocks {}]", self.also_blocks.join(",")));
        }
        text
    }
}

/// Turns a line into terminal text
pub trait Painter {
    fn paint(&self, line: &RenderedLine) -> String;
}

/// No styling at all
pub struct PlainPainter;

impl Painter for PlainPainter {
    fn paint(&self, line: &RenderedLine) -> String {
        line.text()
    }
}

/// ANSI colors via `colored`
pub struct AnsiPainter;

impl Painter for AnsiPainter {
    fn paint(&self, line: &RenderedLine) -> String {
        let text = line.text();
        match line.style {
            TaskStyle::Active => text.bright_green().bold().to_string(),
            TaskStyle::Overdue => text.bright_yellow().bold().to_string(),
            TaskStyle::DueToday => text.yellow().to_string(),
            TaskStyle::Waiting | TaskStyle::LowPriority => text.bright_black().to_string(),
            TaskStyle::HighPriority => text.bright_red().bold().to_string(),
            TaskStyle::Plain => text,
        }
    }
}

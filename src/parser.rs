use crate::graph::{Priority, Task};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a JSON array of tasks, got {found}")]
    NotAnArray { found: &'static str },
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse the output of `task export`.
///
/// The document must be a JSON array. Individual records are read
/// leniently: entries that are not objects or carry no uuid are skipped, and
/// malformed optional fields fall back to their defaults.
pub fn parse_export(json: &str) -> Result<Vec<Task>, ParseError> {
    let trimmed = json.trim();
    // An export with no matches can be empty output on some versions
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let document: Value = serde_json::from_str(trimmed)?;
    let records = match document {
        Value::Array(records) => records,
        other => {
            return Err(ParseError::NotAnArray {
                found: kind_of(&other),
            });
        }
    };

    let mut tasks = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match task_from_value(record) {
            Some(task) => tasks.push(task),
            None => tracing::warn!(index, "skipping export record without a uuid"),
        }
    }
    Ok(tasks)
}

/// Build a task from one export record. Returns None when there is no uuid.
pub fn task_from_value(record: &Value) -> Option<Task> {
    let obj = record.as_object()?;
    let uuid = obj.get("uuid")?.as_str()?.trim();
    if uuid.is_empty() {
        return None;
    }

    let id = obj.get("id").and_then(Value::as_u64);
    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let priority = obj
        .get("priority")
        .and_then(Value::as_str)
        .map(Priority::parse)
        .unwrap_or_default();
    let urgency = obj.get("urgency").map(lenient_f64).unwrap_or(0.0);
    let due = obj
        .get("due")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    let active = obj.get("start").is_some_and(|v| !v.is_null());
    let depends = obj.get("depends").map(parse_depends).unwrap_or_default();

    Some(Task {
        id,
        uuid: uuid.to_string(),
        description,
        priority,
        urgency,
        due,
        active,
        depends,
    })
}

fn lenient_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// `depends` is an array of uuids on current Taskwarrior and a
/// comma-separated string on 2.5 and earlier.
fn parse_depends(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse a Taskwarrior timestamp.
///
/// Accepts the export format (`20240131T120000Z`), RFC 3339, and plain
/// `YYYY-MM-DD[THH:MM:SS]` taken as UTC. Anything else yields None.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%SZ") {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

//! Taskwarrior CLI (`task`) integration
//!
//! Read-only wrapper around the `task` binary: `export` for task records and
//! `_get` for live settings. Each call is one blocking subprocess.

use crate::graph::Task;
use crate::parser::{ParseError, parse_export};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskwarriorError {
    #[error("'{binary}' not found. Is Taskwarrior installed and on PATH?")]
    NotInstalled { binary: String },
    #[error("Failed to run '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' exited with {status}{output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },
    #[error("Failed to parse output of '{command}': {source}")]
    Parse {
        command: String,
        #[source]
        source: ParseError,
    },
}

pub type Result<T> = std::result::Result<T, TaskwarriorError>;

/// Where task records and settings come from
pub trait TaskSource {
    /// Run an export with the given filter arguments.
    fn export(&self, filters: &[String]) -> Result<Vec<Task>>;

    /// Read a setting, e.g. `rc.context`. Returns the trimmed value.
    fn get_setting(&self, key: &str) -> Result<String>;
}

/// Client using the `task` binary
pub struct TaskCli {
    binary: PathBuf,
}

impl Default for TaskCli {
    fn default() -> Self {
        Self::new("task")
    }
}

impl TaskCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn describe(&self, args: &[String]) -> String {
        let mut parts = vec![self.binary.display().to_string()];
        parts.extend(args.iter().cloned());
        parts.join(" ")
    }

    /// Run `task` with `args`, returning stdout on success.
    fn run(&self, args: &[String]) -> Result<String> {
        let command = self.describe(args);
        tracing::debug!(%command, "running taskwarrior");

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => TaskwarriorError::NotInstalled {
                    binary: self.binary.display().to_string(),
                },
                _ => TaskwarriorError::Io {
                    command: command.clone(),
                    source: e,
                },
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let mut captured = String::new();
            if !stderr.is_empty() {
                captured.push_str(&format!("\nstderr: {}", stderr));
            }
            if !stdout.is_empty() {
                captured.push_str(&format!("\nstdout: {}", stdout));
            }
            return Err(TaskwarriorError::CommandFailed {
                command,
                status: output.status.to_string(),
                output: captured,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TaskSource for TaskCli {
    fn export(&self, filters: &[String]) -> Result<Vec<Task>> {
        let mut args = filters.to_vec();
        args.push("export".to_string());
        let stdout = self.run(&args)?;
        let tasks = parse_export(&stdout).map_err(|source| TaskwarriorError::Parse {
            command: self.describe(&args),
            source,
        })?;
        tracing::debug!(count = tasks.len(), "exported tasks");
        Ok(tasks)
    }

    fn get_setting(&self, key: &str) -> Result<String> {
        let stdout = self.run(&["_get".to_string(), key.to_string()])?;
        Ok(stdout.trim().to_string())
    }
}

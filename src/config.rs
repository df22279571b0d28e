//! Configuration for taskwarrior-enhanced
//!
//! Stored in `~/.config/taskwarrior-enhanced/config.toml`. Every field has a
//! default, so a missing file or section is fine. Command-line flags take
//! precedence over anything set here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// How to reach Taskwarrior
    #[serde(default)]
    pub task: TaskConfig,

    /// Output settings
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskConfig {
    /// The `task` executable, a bare name is looked up on PATH
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
}

fn default_binary() -> PathBuf {
    PathBuf::from("task")
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
        }
    }
}

/// When to emit ANSI colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    /// Only when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => std::io::stdout().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default)]
    pub color: ColorChoice,

    /// Append `[also blocks ...]` to tasks with several dependents
    #[serde(default = "default_true")]
    pub annotate_parents: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: ColorChoice::default(),
            annotate_parents: true,
        }
    }
}

impl Config {
    /// Get the path to the global config file
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("taskwarrior-enhanced").join("config.toml"))
    }

    /// Load the global config, or defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let Ok(config_path) = Self::config_path() else {
            return Ok(Self::default());
        };
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`.
    /// Returns default config if the file doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))?;

        Ok(config)
    }
}

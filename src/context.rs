//! Active Taskwarrior context resolution
//!
//! The active context comes from the live `task _get rc.context` query when
//! it answers, otherwise from the taskrc. Context filters are always read
//! from the taskrc, following `include` directives recursively.
//!
//! Resolution is best-effort: a missing binary, a missing or unreadable
//! file, or an unexpandable include path only means less information.

use crate::taskwarrior::TaskSource;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the taskrc to use
pub const TASKRC_ENV: &str = "TASKRC";

/// Setting queried for the live context
const CONTEXT_SETTING: &str = "rc.context";

/// Filter variants defined for one context name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic: Option<String>,
}

impl ContextDefinition {
    /// The filter used for listings: read, then generic, then write.
    pub fn filter(&self) -> Option<&str> {
        self.read
            .as_deref()
            .or(self.generic.as_deref())
            .or(self.write.as_deref())
    }

    fn set(&mut self, variant: Variant, value: String) {
        match variant {
            Variant::Read => self.read = Some(value),
            Variant::Write => self.write = Some(value),
            Variant::Generic => self.generic = Some(value),
        }
    }

    /// Keep our entries, take `other`'s where we have none.
    fn fill_gaps(&mut self, other: &ContextDefinition) {
        if self.read.is_none() {
            self.read = other.read.clone();
        }
        if self.write.is_none() {
            self.write = other.write.clone();
        }
        if self.generic.is_none() {
            self.generic = other.generic.clone();
        }
    }

    /// Take `other`'s entries wherever it has one.
    fn overlay(&mut self, other: &ContextDefinition) {
        if other.read.is_some() {
            self.read = other.read.clone();
        }
        if other.write.is_some() {
            self.write = other.write.clone();
        }
        if other.generic.is_some() {
            self.generic = other.generic.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Read,
    Write,
    Generic,
}

/// One meaningful taskrc line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskrcLine<'a> {
    Include(&'a str),
    Context {
        name: &'a str,
        variant: Variant,
        value: &'a str,
    },
    Active(&'a str),
}

/// Classify a taskrc line. Blank lines, comments and unrelated settings
/// yield None.
pub fn parse_line(line: &str) -> Option<TaskrcLine<'_>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if let Some(rest) = line.strip_prefix("include")
        && rest.starts_with(char::is_whitespace)
    {
        let path = strip_comment(rest);
        return (!path.is_empty()).then_some(TaskrcLine::Include(path));
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = strip_comment(value);

    if key == "context" {
        return Some(TaskrcLine::Active(value));
    }

    let name = key.strip_prefix("context.")?;
    let (name, variant) = if let Some(name) = name.strip_suffix(".read") {
        (name, Variant::Read)
    } else if let Some(name) = name.strip_suffix(".write") {
        (name, Variant::Write)
    } else {
        (name, Variant::Generic)
    };
    if name.is_empty() {
        return None;
    }
    Some(TaskrcLine::Context {
        name,
        variant,
        value,
    })
}

fn strip_comment(value: &str) -> &str {
    match value.find('#') {
        Some(pos) => value[..pos].trim(),
        None => value.trim(),
    }
}

/// Context information gathered from a taskrc and its includes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskrcContexts {
    /// Value of the last `context=` line
    pub active: Option<String>,
    pub definitions: BTreeMap<String, ContextDefinition>,
}

impl TaskrcContexts {
    /// Parse `path` and everything it includes.
    pub fn load(path: &Path) -> Self {
        let mut visited = HashSet::new();
        parse_file(path, &mut visited)
    }

    pub fn filter_for(&self, name: &str) -> Option<&str> {
        self.definitions.get(name).and_then(ContextDefinition::filter)
    }

    /// Entries of `later` replace ours.
    fn overlay(&mut self, later: TaskrcContexts) {
        if later.active.is_some() {
            self.active = later.active;
        }
        for (name, def) in later.definitions {
            self.definitions.entry(name).or_default().overlay(&def);
        }
    }

    /// Our entries win; `nested` only fills gaps.
    fn fill_gaps(&mut self, nested: TaskrcContexts) {
        if self.active.is_none() {
            self.active = nested.active;
        }
        for (name, def) in nested.definitions {
            self.definitions.entry(name).or_default().fill_gaps(&def);
        }
    }
}

fn parse_file(path: &Path, visited: &mut HashSet<PathBuf>) -> TaskrcContexts {
    let canonical = match fs::canonicalize(path) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "taskrc not found");
            return TaskrcContexts::default();
        }
    };
    if !visited.insert(canonical.clone()) {
        tracing::debug!(path = %canonical.display(), "taskrc already parsed, skipping include");
        return TaskrcContexts::default();
    }
    let content = match fs::read_to_string(&canonical) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(path = %canonical.display(), error = %e, "taskrc unreadable");
            return TaskrcContexts::default();
        }
    };

    let base_dir = canonical.parent().unwrap_or(Path::new("/"));
    let mut own = TaskrcContexts::default();
    let mut nested = TaskrcContexts::default();

    for line in content.lines() {
        match parse_line(line) {
            Some(TaskrcLine::Include(raw)) => {
                let include = resolve_include(raw, base_dir);
                tracing::debug!(from = %canonical.display(), include = %include.display(), "following include");
                nested.overlay(parse_file(&include, visited));
            }
            Some(TaskrcLine::Context {
                name,
                variant,
                value,
            }) => {
                own.definitions
                    .entry(name.to_string())
                    .or_default()
                    .set(variant, value.to_string());
            }
            Some(TaskrcLine::Active(value)) => own.active = Some(value.to_string()),
            None => {}
        }
    }

    own.fill_gaps(nested);
    own
}

/// Expand variables and `~`, then resolve relative paths against the
/// including file's directory.
fn resolve_include(raw: &str, base_dir: &Path) -> PathBuf {
    let expanded = match shellexpand::full(raw) {
        Ok(expanded) => expanded.into_owned(),
        Err(e) => {
            tracing::debug!(include = raw, error = %e, "could not expand include path");
            shellexpand::tilde(raw).into_owned()
        }
    };
    let path = PathBuf::from(expanded);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// First existing taskrc among the override, `~/.taskrc` and
/// `<config dir>/task/taskrc`.
pub fn locate_taskrc(
    override_path: Option<PathBuf>,
    home: Option<PathBuf>,
    config_home: Option<PathBuf>,
) -> Option<PathBuf> {
    let config_home = config_home.or_else(|| home.as_ref().map(|h| h.join(".config")));
    let candidates = [
        override_path,
        home.map(|h| h.join(".taskrc")),
        config_home.map(|c| c.join("task").join("taskrc")),
    ];
    candidates.into_iter().flatten().find(|p| p.is_file())
}

/// Locate the taskrc from the process environment.
pub fn default_taskrc() -> Option<PathBuf> {
    let override_path = std::env::var_os(TASKRC_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let config_home = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    locate_taskrc(override_path, dirs::home_dir(), config_home)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextSource {
    Live,
    Taskrc,
}

/// The context in effect and its filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedContext {
    pub name: Option<String>,
    /// Listing filter, empty when the context has no known definition
    pub filter: String,
    pub source: Option<ContextSource>,
}

impl ResolvedContext {
    /// Arguments that apply this context to an export: the filter in
    /// parentheses, or `rc.context=<name>` when no filter is known.
    pub fn filter_args(&self) -> Vec<String> {
        let Some(name) = &self.name else {
            return Vec::new();
        };
        if self.filter.is_empty() {
            return vec![format!("rc.context={}", name)];
        }
        let words = shlex::split(&self.filter).unwrap_or_else(|| {
            tracing::warn!(context = %name, filter = %self.filter, "unbalanced quotes in context filter");
            self.filter.split_whitespace().map(str::to_string).collect()
        });
        let mut args = Vec::with_capacity(words.len() + 2);
        args.push("(".to_string());
        args.extend(words);
        args.push(")".to_string());
        args
    }
}

/// `none` and empty values mean no context.
fn meaningful(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty() && name != "none").then(|| name.to_string())
}

pub struct ContextResolver<'a> {
    source: &'a dyn TaskSource,
    taskrc: Option<PathBuf>,
}

impl<'a> ContextResolver<'a> {
    pub fn new(source: &'a dyn TaskSource, taskrc: Option<PathBuf>) -> Self {
        Self { source, taskrc }
    }

    /// Resolve using the taskrc found in the process environment.
    pub fn from_env(source: &'a dyn TaskSource) -> Self {
        Self::new(source, default_taskrc())
    }

    fn live_context(&self) -> Option<String> {
        match self.source.get_setting(CONTEXT_SETTING) {
            Ok(value) => meaningful(&value),
            Err(e) => {
                tracing::debug!(error = %e, "live context query failed");
                None
            }
        }
    }

    pub fn resolve(&self) -> ResolvedContext {
        let live = self.live_context();
        let taskrc = self
            .taskrc
            .as_deref()
            .map(TaskrcContexts::load)
            .unwrap_or_default();

        let (name, source) = match live {
            Some(name) => (Some(name), Some(ContextSource::Live)),
            None => match taskrc.active.as_deref().and_then(meaningful) {
                Some(name) => (Some(name), Some(ContextSource::Taskrc)),
                None => (None, None),
            },
        };

        let filter = name
            .as_deref()
            .and_then(|n| taskrc.filter_for(n))
            .unwrap_or_default()
            .to_string();

        tracing::debug!(context = ?name, source = ?source, %filter, "resolved context");
        ResolvedContext {
            name,
            filter,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Task;
    use crate::taskwarrior::{Result, TaskwarriorError};
    use serial_test::serial;
    use tempfile::TempDir;

    /// Answers `_get` with a fixed value, or fails like a missing binary.
    struct FakeSource {
        live: Option<String>,
    }

    impl TaskSource for FakeSource {
        fn export(&self, _filters: &[String]) -> Result<Vec<Task>> {
            Ok(Vec::new())
        }

        fn get_setting(&self, _key: &str) -> Result<String> {
            self.live.clone().ok_or(TaskwarriorError::NotInstalled {
                binary: "task".to_string(),
            })
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_line_kinds() {
        assert_eq!(parse_line("  "), None);
        assert_eq!(parse_line("# context=work"), None);
        assert_eq!(parse_line("data.location=~/.task"), None);
        assert_eq!(
            parse_line("include ~/.task/contexts"),
            Some(TaskrcLine::Include("~/.task/contexts"))
        );
        assert_eq!(parse_line("context=work  # set by task"), Some(TaskrcLine::Active("work")));
        assert_eq!(
            parse_line("context.work=project:work # day job"),
            Some(TaskrcLine::Context {
                name: "work",
                variant: Variant::Generic,
                value: "project:work"
            })
        );
        assert_eq!(
            parse_line("context.home.read=project:home or +errand"),
            Some(TaskrcLine::Context {
                name: "home",
                variant: Variant::Read,
                value: "project:home or +errand"
            })
        );
        assert_eq!(
            parse_line("context.home.write=project:home"),
            Some(TaskrcLine::Context {
                name: "home",
                variant: Variant::Write,
                value: "project:home"
            })
        );
    }

    #[test]
    fn test_include_drops_trailing_comment() {
        assert_eq!(
            parse_line("include foo.rc # theme"),
            Some(TaskrcLine::Include("foo.rc"))
        );
        assert_eq!(parse_line("include # nothing"), None);
    }

    #[test]
    fn test_include_needs_whitespace() {
        assert_eq!(parse_line("includes=foo"), None);
    }

    #[test]
    fn test_filter_preference() {
        let mut def = ContextDefinition {
            write: Some("w".to_string()),
            ..Default::default()
        };
        assert_eq!(def.filter(), Some("w"));
        def.generic = Some("g".to_string());
        assert_eq!(def.filter(), Some("g"));
        def.read = Some("r".to_string());
        assert_eq!(def.filter(), Some("r"));
    }

    #[test]
    fn test_load_single_file() {
        let dir = TempDir::new().unwrap();
        let rc = write(
            &dir,
            "taskrc",
            "# contexts\ncontext.work=project:work\ncontext=home\ncontext.home.write=project:home\ncontext=work\n",
        );
        let parsed = TaskrcContexts::load(&rc);
        assert_eq!(parsed.active.as_deref(), Some("work"));
        assert_eq!(parsed.filter_for("work"), Some("project:work"));
        assert_eq!(parsed.filter_for("home"), Some("project:home"));
        assert_eq!(parsed.filter_for("gym"), None);
    }

    #[test]
    fn test_relative_include() {
        let dir = TempDir::new().unwrap();
        write(&dir, "conf/contexts.rc", "context.work=project:work\ncontext=work\n");
        let rc = write(&dir, "conf/taskrc", "include contexts.rc\n");
        let parsed = TaskrcContexts::load(&rc);
        assert_eq!(parsed.active.as_deref(), Some("work"));
        assert_eq!(parsed.filter_for("work"), Some("project:work"));
    }

    #[test]
    fn test_outer_file_wins_and_nested_fills_gaps() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "nested.rc",
            "context=nested\ncontext.work.read=nested-read\ncontext.work.write=nested-write\n",
        );
        let rc = write(
            &dir,
            "taskrc",
            "context=outer\ninclude nested.rc\ncontext.work.read=outer-read\n",
        );
        let parsed = TaskrcContexts::load(&rc);
        assert_eq!(parsed.active.as_deref(), Some("outer"));
        let work = &parsed.definitions["work"];
        assert_eq!(work.read.as_deref(), Some("outer-read"));
        assert_eq!(work.write.as_deref(), Some("nested-write"));
    }

    #[test]
    fn test_self_include_terminates() {
        let dir = TempDir::new().unwrap();
        let rc = write(&dir, "taskrc", "context.a=+a\ninclude taskrc\ncontext=a\n");
        let parsed = TaskrcContexts::load(&rc);
        assert_eq!(parsed.active.as_deref(), Some("a"));
        assert_eq!(parsed.filter_for("a"), Some("+a"));
    }

    #[test]
    fn test_include_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.rc", "include b.rc\ncontext.a=+a\n");
        write(&dir, "b.rc", "include a.rc\ncontext.b=+b\n");
        let parsed = TaskrcContexts::load(&dir.path().join("a.rc"));
        assert_eq!(parsed.filter_for("a"), Some("+a"));
        assert_eq!(parsed.filter_for("b"), Some("+b"));
    }

    #[test]
    fn test_missing_include_and_file() {
        let dir = TempDir::new().unwrap();
        let rc = write(&dir, "taskrc", "include /nonexistent/theme\ncontext.x=+x\n");
        assert_eq!(TaskrcContexts::load(&rc).filter_for("x"), Some("+x"));
        assert_eq!(
            TaskrcContexts::load(&dir.path().join("missing")),
            TaskrcContexts::default()
        );
    }

    #[test]
    #[serial]
    fn test_include_expands_env_vars() {
        let dir = TempDir::new().unwrap();
        write(&dir, "env/contexts.rc", "context.env=+env\n");
        let rc = write(&dir, "taskrc", "include $TWE_TEST_RC_DIR/contexts.rc\n");

        // SAFETY: serialized with other tests touching the environment
        unsafe { std::env::set_var("TWE_TEST_RC_DIR", dir.path().join("env")) };
        let parsed = TaskrcContexts::load(&rc);
        unsafe { std::env::remove_var("TWE_TEST_RC_DIR") };

        assert_eq!(parsed.filter_for("env"), Some("+env"));
    }

    #[test]
    #[serial]
    fn test_include_expands_tilde() {
        let dir = TempDir::new().unwrap();
        write(&dir, "home/rc/contexts.rc", "context.tilde=+tilde\n");
        let rc = write(&dir, "taskrc", "include ~/rc/contexts.rc # shared\n");

        let saved_home = std::env::var_os("HOME");
        // SAFETY: serialized with other tests touching the environment
        unsafe { std::env::set_var("HOME", dir.path().join("home")) };
        let parsed = TaskrcContexts::load(&rc);
        match saved_home {
            Some(home) => unsafe { std::env::set_var("HOME", home) },
            None => unsafe { std::env::remove_var("HOME") },
        }

        assert_eq!(parsed.filter_for("tilde"), Some("+tilde"));
    }

    #[test]
    fn test_locate_taskrc_order() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let xdg = write(&dir, "home/.config/task/taskrc", "");

        assert_eq!(locate_taskrc(None, Some(home.clone()), None), Some(xdg.clone()));

        let dotfile = write(&dir, "home/.taskrc", "");
        assert_eq!(locate_taskrc(None, Some(home.clone()), None), Some(dotfile.clone()));

        let custom = write(&dir, "custom.rc", "");
        assert_eq!(
            locate_taskrc(Some(custom.clone()), Some(home.clone()), None),
            Some(custom)
        );

        // An override that does not exist falls through
        assert_eq!(
            locate_taskrc(Some(dir.path().join("nope")), Some(home), None),
            Some(dotfile)
        );
        assert_eq!(locate_taskrc(None, None, None), None);
    }

    #[test]
    fn test_resolve_prefers_live_context() {
        let dir = TempDir::new().unwrap();
        let rc = write(&dir, "taskrc", "context=home\ncontext.work=project:work\ncontext.home=project:home\n");
        let source = FakeSource {
            live: Some("work".to_string()),
        };
        let resolved = ContextResolver::new(&source, Some(rc)).resolve();
        assert_eq!(resolved.name.as_deref(), Some("work"));
        assert_eq!(resolved.filter, "project:work");
        assert_eq!(resolved.source, Some(ContextSource::Live));
    }

    #[test]
    fn test_resolve_falls_back_to_taskrc() {
        let dir = TempDir::new().unwrap();
        let rc = write(&dir, "taskrc", "context=home\ncontext.home=project:home\n");
        let failing = FakeSource { live: None };
        let resolved = ContextResolver::new(&failing, Some(rc.clone())).resolve();
        assert_eq!(resolved.name.as_deref(), Some("home"));
        assert_eq!(resolved.source, Some(ContextSource::Taskrc));

        // An empty live answer also falls back
        let empty = FakeSource {
            live: Some(String::new()),
        };
        let resolved = ContextResolver::new(&empty, Some(rc)).resolve();
        assert_eq!(resolved.filter, "project:home");
    }

    #[test]
    fn test_resolve_nothing() {
        let source = FakeSource { live: None };
        let resolved = ContextResolver::new(&source, None).resolve();
        assert_eq!(resolved, ResolvedContext::default());
        assert!(resolved.filter_args().is_empty());
    }

    #[test]
    fn test_none_context_is_no_context() {
        let source = FakeSource {
            live: Some("none".to_string()),
        };
        assert_eq!(ContextResolver::new(&source, None).resolve().name, None);
    }

    #[test]
    fn test_filter_args() {
        let with_filter = ResolvedContext {
            name: Some("work".to_string()),
            filter: "project:work or \"description:big deal\"".to_string(),
            source: Some(ContextSource::Live),
        };
        assert_eq!(
            with_filter.filter_args(),
            vec!["(", "project:work", "or", "description:big deal", ")"]
        );

        let name_only = ResolvedContext {
            name: Some("gym".to_string()),
            filter: String::new(),
            source: Some(ContextSource::Taskrc),
        };
        assert_eq!(name_only.filter_args(), vec!["rc.context=gym"]);
    }
}

use anyhow::Result;
use taskwarrior_enhanced::context::{ContextSource, ResolvedContext};

use super::Output;

pub fn run(context: &ResolvedContext, output: &Output) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(context)?);
    } else {
        println!("{}", describe(context));
    }
    Ok(())
}

fn describe(context: &ResolvedContext) -> String {
    let Some(name) = &context.name else {
        return "No active context".to_string();
    };
    let source = match context.source {
        Some(ContextSource::Live) => "task",
        Some(ContextSource::Taskrc) => "taskrc",
        None => "unknown",
    };
    let filter = if context.filter.is_empty() {
        "(not defined in taskrc)"
    } else {
        context.filter.as_str()
    };
    format!("Context: {} (from {})\nFilter:  {}", name, source, filter)
}

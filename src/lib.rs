pub mod chain;
pub mod config;
pub mod context;
pub mod graph;
pub mod parser;
pub mod style;
pub mod taskwarrior;
pub mod tree;

#[cfg(test)]
pub mod test_helpers;

pub use chain::{ChainError, ChainRenderer, select_task};
pub use config::{ColorChoice, Config};
pub use context::{ContextResolver, ContextSource, ResolvedContext};
pub use graph::{DependencyGraph, Priority, Task, TaskSet};
pub use parser::{ParseError, parse_export};
pub use style::{AnsiPainter, Painter, PlainPainter, RenderedLine, TaskStyle};
pub use taskwarrior::{TaskCli, TaskSource, TaskwarriorError};
pub use tree::TreeRenderer;

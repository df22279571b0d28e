use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use taskwarrior_enhanced::config::{ColorChoice, Config};
use taskwarrior_enhanced::context::ContextResolver;
use taskwarrior_enhanced::style::{AnsiPainter, Painter, PlainPainter};
use taskwarrior_enhanced::taskwarrior::TaskCli;

mod commands;

#[derive(Parser)]
#[command(name = "twe")]
#[command(about = "Dependency trees and chains for Taskwarrior")]
#[command(version)]
struct Cli {
    /// Output as JSON for machine consumption
    #[arg(long, global = true)]
    json: bool,

    /// When to color output (default: from config, else auto)
    #[arg(long, global = true, value_enum)]
    color: Option<ColorChoice>,

    /// Path to the Taskwarrior executable
    #[arg(long = "task-bin", global = true)]
    task_bin: Option<PathBuf>,

    /// Config file (default: ~/.config/taskwarrior-enhanced/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show pending and waiting tasks as a dependency forest
    Tree {
        /// Extra filter arguments passed to `task export`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        filters: Vec<String>,
    },

    /// Show a task and everything that transitively depends on it
    Chain {
        /// Task id, uuid, or uuid prefix
        task: String,
    },

    /// Show the active context and its filter
    Context,
}

/// Log to stderr, colored only when `ansi` is set.
fn init_tracing(verbose: bool, ansi: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let ansi_logs = cli.color != Some(ColorChoice::Never) && std::io::stderr().is_terminal();
    init_tracing(cli.verbose, ansi_logs);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let color = cli.color.unwrap_or(config.display.color);
    let painter: Box<dyn Painter> = if color.enabled() {
        colored::control::set_override(true);
        Box::new(AnsiPainter)
    } else {
        colored::control::set_override(false);
        Box::new(PlainPainter)
    };
    let output = commands::Output {
        json: cli.json,
        painter,
    };

    let source = TaskCli::new(cli.task_bin.unwrap_or(config.task.binary));

    match cli.command {
        Commands::Tree { filters } => {
            let context = ContextResolver::from_env(&source).resolve();
            commands::tree::run(
                &source,
                &context,
                &filters,
                config.display.annotate_parents,
                &output,
            )
        }
        Commands::Chain { task } => commands::chain::run(&source, &task, &output),
        Commands::Context => {
            let context = ContextResolver::from_env(&source).resolve();
            commands::context::run(&context, &output)
        }
    }
}

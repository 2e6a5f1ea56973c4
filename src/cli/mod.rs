//! CLI command definitions for taskwright
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::format::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Task used by `run` when none is named.
pub const DEFAULT_TASK: &str = "default";

/// Declarative build pipeline runner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline file (default: ./taskwright.yaml, or $TASKWRIGHT_FILE)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Overlay the named preset's task table on the base tasks
    #[arg(short, long, global = true)]
    pub preset: Option<String>,

    /// Override a top-level config key (repeatable): --set key=value
    #[arg(short, long = "set", value_name = "KEY=VALUE", global = true)]
    pub set: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run tasks in order (default if no subcommand given)
    Run(RunArgs),

    /// Run the initial tasks, then rerun bound tasks on file changes
    Watch(WatchArgs),

    /// List registered tasks
    List(ListArgs),

    /// Validate task references, delegates and config without running anything
    Check,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Tasks to run (default: "default")
    pub tasks: Vec<String>,
}

impl RunArgs {
    /// Requested tasks, falling back to the default task.
    pub fn tasks_or_default(&self) -> Vec<String> {
        if self.tasks.is_empty() {
            vec![DEFAULT_TASK.to_string()]
        } else {
            self.tasks.clone()
        }
    }
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Tasks to run before watching (default: the pipeline's watch.initial)
    #[arg(long, value_delimiter = ',')]
    pub initial: Option<Vec<String>>,

    /// Skip the initial run
    #[arg(long)]
    pub no_initial: bool,

    /// Debounce window in milliseconds (default: the pipeline's watch.debounce_ms)
    #[arg(long)]
    pub debounce_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format: text or json
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

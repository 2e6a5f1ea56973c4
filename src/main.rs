//! taskwright
//!
//! Runs named tasks from a declarative pipeline file, or watches the project
//! and reruns bound tasks when files change.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use taskwright::cli::{Cli, Command, ListArgs, RunArgs, WatchArgs};
use taskwright::config::{ConfigLoader, LoadOptions, PipelinePaths, parse_set};
use taskwright::format::{
    OutputFormat, format_issues_text, format_run_summary, format_tasks_text, tasks_json,
};
use taskwright::logging::{self, LogTarget};
use taskwright::watch::{WatchScheduler, WatcherConfig, start_file_watcher};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let options = LoadOptions {
        preset: cli.preset.clone(),
        set: cli
            .set
            .iter()
            .map(String::as_str)
            .map(parse_set)
            .collect::<Result<_>>()
            .context("Invalid --set argument")?,
    };
    let paths = PipelinePaths::discover(cli.file.as_deref())?;
    let loader = ConfigLoader::load(paths, &options)?;

    match cli.command {
        Some(Command::Run(args)) => run_tasks(&loader, &args).await,
        None => run_tasks(&loader, &RunArgs::default()).await,
        Some(Command::Watch(args)) => run_watch(loader, options, args).await,
        Some(Command::List(args)) => list_tasks(&loader, &args),
        Some(Command::Check) => check_pipeline(&loader),
    }
}

async fn run_tasks(loader: &ConfigLoader, args: &RunArgs) -> Result<()> {
    let tasks = args.tasks_or_default();
    let runner = loader.runner();
    let result = tokio::task::spawn_blocking(move || runner.run_all(&tasks)).await?;

    match result {
        Ok(reports) => {
            print!("{}", format_run_summary(&reports));
            Ok(())
        }
        Err(failure) => {
            error!(
                task = %failure.task,
                chain = ?failure.chain,
                code = ?failure.code(),
                "Run aborted"
            );
            Err(failure.into())
        }
    }
}

async fn run_watch(loader: ConfigLoader, options: LoadOptions, args: WatchArgs) -> Result<()> {
    let bindings = loader.watch_bindings()?;
    if bindings.is_empty() {
        warn!("Pipeline defines no watch bindings; only the pipeline file is watched");
    }
    let watch_paths = loader.watch_paths()?;
    let watch = &loader.pipeline().watch;
    let debounce = Duration::from_millis(args.debounce_ms.unwrap_or(watch.debounce_ms));
    let initial = args.initial.unwrap_or_else(|| watch.initial.clone());

    let reload_paths = loader.paths.clone();
    let scheduler = Arc::new(
        WatchScheduler::new(loader.runner(), bindings, loader.notifier()).with_reloader(
            move || Ok(ConfigLoader::load(reload_paths.clone(), &options)?.runner()),
        ),
    );

    if !args.no_initial && !initial.is_empty() {
        info!(tasks = ?initial, "Running initial tasks");
        let initial_scheduler = Arc::clone(&scheduler);
        let result =
            tokio::task::spawn_blocking(move || initial_scheduler.run_initial(&initial)).await?;
        if let Err(failure) = result {
            error!(task = %failure.task, "Initial run failed; not watching");
            return Err(failure.into());
        }
    }

    let handle = start_file_watcher(
        watch_paths,
        WatcherConfig {
            debounce_duration: debounce,
        },
    )
    .context("Failed to start file watcher")?;

    tokio::select! {
        _ = scheduler.watch(handle.events) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping watch"),
    }
    Ok(())
}

fn list_tasks(loader: &ConfigLoader, args: &ListArgs) -> Result<()> {
    match args.format {
        OutputFormat::Text => print!("{}", format_tasks_text(loader.registry())),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&tasks_json(loader.registry()))?
        ),
    }
    Ok(())
}

fn check_pipeline(loader: &ConfigLoader) -> Result<()> {
    let issues = loader.check();
    if issues.is_empty() {
        println!("{} task(s) OK", loader.registry().len());
        return Ok(());
    }
    eprint!("{}", format_issues_text(&issues));
    bail!("{} problem(s) found", issues.len())
}

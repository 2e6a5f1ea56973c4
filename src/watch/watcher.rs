//! File watcher feeding the watch scheduler.
//!
//! Watches the project root recursively through a debounced `notify`
//! watcher and forwards classified events over a tokio channel. Changes to
//! the pipeline file, its imports or the project override file are reported
//! separately so the scheduler can reload tasks and configuration.

use crate::paths::ProjectRoot;
use glob::Pattern;
use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, error, info};

/// Events delivered to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Files changed, as paths relative to the project root.
    Changed(Vec<String>),
    /// The pipeline file or one of its config sources changed.
    PipelineChanged,
    /// Watcher encountered an error.
    Error(String),
}

/// What to watch.
#[derive(Debug, Clone)]
pub struct WatchPaths {
    pub root: ProjectRoot,
    /// Pipeline file and config sources, reported as
    /// [`WatchEvent::PipelineChanged`].
    pub config_files: Vec<PathBuf>,
    /// Relative paths matching any of these are dropped.
    pub ignore: Vec<Pattern>,
}

impl WatchPaths {
    pub fn new(root: ProjectRoot) -> Self {
        Self {
            root,
            config_files: Vec::new(),
            ignore: Vec::new(),
        }
    }

    pub fn with_config_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.config_files.push(file.into());
        self
    }

    pub fn with_ignore(mut self, ignore: Vec<Pattern>) -> Self {
        self.ignore = ignore;
        self
    }
}

/// How often the blocking loop checks whether the receiver is gone.
const RECEIVER_POLL: Duration = Duration::from_millis(500);

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(250),
        }
    }
}

/// Handle to the running watcher. Dropping the receiver stops it.
pub struct FileWatcherHandle {
    pub events: tokio_mpsc::UnboundedReceiver<WatchEvent>,
    _task_handle: tokio::task::JoinHandle<()>,
}

/// Start watching the project root.
pub fn start_file_watcher(
    paths: WatchPaths,
    config: WatcherConfig,
) -> Result<FileWatcherHandle, notify::Error> {
    let (event_tx, event_rx) = tokio_mpsc::unbounded_channel();
    let (notify_tx, notify_rx) = mpsc::channel();

    let mut debouncer = new_debouncer(config.debounce_duration, notify_tx)?;
    debouncer
        .watcher()
        .watch(paths.root.path(), notify::RecursiveMode::Recursive)?;
    info!("Watching project directory: {}", paths.root.path().display());

    let task_handle = tokio::task::spawn_blocking(move || {
        // Keep the debouncer alive
        let _debouncer = debouncer;
        process_notify_events(notify_rx, event_tx, &paths);
    });

    Ok(FileWatcherHandle {
        events: event_rx,
        _task_handle: task_handle,
    })
}

fn process_notify_events(
    rx: mpsc::Receiver<Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>>,
    tx: tokio_mpsc::UnboundedSender<WatchEvent>,
    paths: &WatchPaths,
) {
    loop {
        match rx.recv_timeout(RECEIVER_POLL) {
            Ok(Ok(events)) => {
                let changed: Vec<PathBuf> = events
                    .into_iter()
                    .filter(|e| {
                        matches!(
                            e.kind,
                            DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                        )
                    })
                    .map(|e| e.path)
                    .collect();
                for event in classify_paths(&changed, paths) {
                    debug!("File change detected: {:?}", event);
                    if tx.send(event).is_err() {
                        info!("Watch receiver dropped, stopping");
                        return;
                    }
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
                if tx.send(WatchEvent::Error(e.to_string())).is_err() {
                    return;
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if tx.is_closed() {
                    debug!("Watch receiver dropped, stopping");
                    return;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                info!("File watcher channel closed, stopping");
                return;
            }
        }
    }
}

/// Turn a debounced batch into scheduler events.
pub fn classify_paths(changed: &[PathBuf], paths: &WatchPaths) -> Vec<WatchEvent> {
    let mut pipeline_changed = false;
    let mut relative: Vec<String> = Vec::new();

    for path in changed {
        if is_config_file(path, paths) {
            pipeline_changed = true;
            continue;
        }
        let Some(rel) = paths.root.relative(path) else {
            continue;
        };
        if rel.is_empty() || paths.ignore.iter().any(|p| p.matches(&rel)) {
            continue;
        }
        if !relative.contains(&rel) {
            relative.push(rel);
        }
    }

    let mut events = Vec::new();
    if pipeline_changed {
        events.push(WatchEvent::PipelineChanged);
    }
    if !relative.is_empty() {
        events.push(WatchEvent::Changed(relative));
    }
    events
}

fn is_config_file(path: &Path, paths: &WatchPaths) -> bool {
    let canonical = std::fs::canonicalize(path).ok();
    paths.config_files.iter().any(|file| {
        let resolved = paths.root.resolve(file);
        let file = std::fs::canonicalize(&resolved).unwrap_or(resolved);
        path == file || canonical.as_ref().is_some_and(|p| *p == file)
    })
}

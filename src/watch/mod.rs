//! Watch scheduler: rebuild on file changes.
//!
//! After an initial full run, every change event is matched against the
//! configured bindings. Each matched binding runs its task list on the
//! blocking pool, independently of other bindings. A binding never runs
//! twice at once: a trigger that arrives while it is running marks it dirty
//! and exactly one follow-up run happens after the current one ends.

mod notifier;
pub mod watcher;

pub use notifier::{LogNotifier, Notifier, TouchNotifier};
pub use watcher::{FileWatcherHandle, WatchEvent, WatchPaths, WatcherConfig, start_file_watcher};

use crate::config::ConfigStore;
use crate::error::{PipelineError, PipelineResult, TaskFailure};
use crate::runner::{RunReport, TaskRunner};
use crate::template;
use arc_swap::ArcSwap;
use glob::Pattern;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Association between file patterns and the tasks to rerun.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    pub name: String,
    pub patterns: Vec<Pattern>,
    pub tasks: Vec<String>,
    pub notify_on_change: bool,
}

impl WatchBinding {
    /// Build a binding, resolving templates in `patterns` against `store`.
    pub fn new(
        name: impl Into<String>,
        patterns: &[String],
        tasks: Vec<String>,
        notify_on_change: bool,
        store: &ConfigStore,
    ) -> PipelineResult<Self> {
        let name = name.into();
        let mut compiled = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let resolved = template::resolve_str(raw, store)?;
            let pattern = Pattern::new(&resolved).map_err(|e| {
                PipelineError::invalid_config(
                    &name,
                    &format!("Invalid watch pattern '{}': {}", resolved, e),
                )
            })?;
            compiled.push(pattern);
        }
        Ok(Self {
            name,
            patterns: compiled,
            tasks,
            notify_on_change,
        })
    }

    /// Whether a project-relative path matches any pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Idle,
    Running,
    /// Running, and triggered again since it started.
    Dirty,
}

struct SlotInner {
    state: SlotState,
    /// Paths that triggered the pending run.
    changed: Vec<String>,
}

struct BindingSlot {
    binding: WatchBinding,
    inner: Mutex<SlotInner>,
}

impl BindingSlot {
    fn lock(&self) -> std::sync::MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type Reloader = Box<dyn Fn() -> anyhow::Result<TaskRunner> + Send + Sync>;

/// Drives reruns of watch bindings.
pub struct WatchScheduler {
    runner: Arc<ArcSwap<TaskRunner>>,
    slots: Vec<Arc<BindingSlot>>,
    notifier: Arc<dyn Notifier>,
    reloader: Option<Reloader>,
}

impl WatchScheduler {
    pub fn new(runner: TaskRunner, bindings: Vec<WatchBinding>, notifier: Arc<dyn Notifier>) -> Self {
        let slots = bindings
            .into_iter()
            .map(|binding| {
                Arc::new(BindingSlot {
                    binding,
                    inner: Mutex::new(SlotInner {
                        state: SlotState::Idle,
                        changed: Vec::new(),
                    }),
                })
            })
            .collect();
        Self {
            runner: Arc::new(ArcSwap::from_pointee(runner)),
            slots,
            notifier,
            reloader: None,
        }
    }

    /// Rebuild the runner when the pipeline file changes.
    pub fn with_reloader(
        mut self,
        reloader: impl Fn() -> anyhow::Result<TaskRunner> + Send + Sync + 'static,
    ) -> Self {
        self.reloader = Some(Box::new(reloader));
        self
    }

    /// Swap in a new runner. Runs already in flight keep the old one.
    pub fn replace_runner(&self, runner: TaskRunner) {
        self.runner.store(Arc::new(runner));
    }

    /// The runner new runs will use.
    pub fn runner(&self) -> Arc<TaskRunner> {
        self.runner.load_full()
    }

    pub fn bindings(&self) -> impl Iterator<Item = &WatchBinding> {
        self.slots.iter().map(|s| &s.binding)
    }

    /// Run the initial task list synchronously, before any watching.
    pub fn run_initial<S: AsRef<str>>(&self, tasks: &[S]) -> Result<Vec<RunReport>, TaskFailure> {
        self.runner.load().run_all(tasks)
    }

    /// Indices of bindings matching any of `paths`.
    pub fn matching(&self, paths: &[String]) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| paths.iter().any(|p| slot.binding.matches(p)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Trigger every binding matching `paths`.
    ///
    /// Returns handles for runs that were started; coalesced triggers
    /// return nothing.
    pub fn dispatch(&self, paths: &[String]) -> Vec<JoinHandle<()>> {
        let matched = self.matching(paths);
        if matched.is_empty() {
            debug!(?paths, "No binding matches changed files");
        }
        matched
            .into_iter()
            .filter_map(|index| {
                let slot = &self.slots[index];
                let changed: Vec<String> = paths
                    .iter()
                    .filter(|p| slot.binding.matches(p))
                    .cloned()
                    .collect();
                self.trigger(index, changed)
            })
            .collect()
    }

    /// Trigger one binding.
    ///
    /// Starts a run on the blocking pool when the binding is idle. Otherwise
    /// marks it dirty so that one more run follows the current one.
    pub fn trigger(&self, index: usize, changed: Vec<String>) -> Option<JoinHandle<()>> {
        let slot = Arc::clone(self.slots.get(index)?);
        {
            let mut inner = slot.lock();
            for path in changed {
                if !inner.changed.contains(&path) {
                    inner.changed.push(path);
                }
            }
            match inner.state {
                SlotState::Idle => inner.state = SlotState::Running,
                SlotState::Running | SlotState::Dirty => {
                    inner.state = SlotState::Dirty;
                    debug!(binding = %slot.binding.name, "Binding busy, queued one rerun");
                    return None;
                }
            }
        }

        let runner = Arc::clone(&self.runner);
        let notifier = Arc::clone(&self.notifier);
        Some(tokio::task::spawn_blocking(move || {
            run_binding(&slot, &runner, notifier.as_ref());
        }))
    }

    /// Consume change events until the channel closes.
    pub async fn watch(&self, mut events: mpsc::UnboundedReceiver<WatchEvent>) {
        info!(bindings = self.slots.len(), "Waiting for file changes");
        while let Some(event) = events.recv().await {
            match event {
                WatchEvent::Changed(paths) => {
                    for path in &paths {
                        info!(file = %path, "File changed");
                    }
                    self.dispatch(&paths);
                }
                WatchEvent::PipelineChanged => self.reload(),
                WatchEvent::Error(message) => warn!(error = %message, "File watcher error"),
            }
        }
        info!("Watch event stream closed");
    }

    fn reload(&self) {
        let Some(ref reloader) = self.reloader else {
            info!("Pipeline or config file changed; restart to pick up changes");
            return;
        };
        match reloader() {
            Ok(runner) => {
                self.replace_runner(runner);
                info!("Pipeline reloaded; watch bindings take effect on restart");
            }
            Err(e) => warn!(error = %format!("{:#}", e), "Pipeline reload failed, keeping previous tasks"),
        }
    }
}

/// Run a binding until no rerun is pending.
fn run_binding(slot: &BindingSlot, runner: &ArcSwap<TaskRunner>, notifier: &dyn Notifier) {
    let binding = &slot.binding;
    loop {
        let changed = std::mem::take(&mut slot.lock().changed);
        let snapshot = runner.load_full();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| snapshot.run_all(&binding.tasks)));
        match outcome {
            Ok(Ok(reports)) => {
                let steps: usize = reports.iter().map(|r| r.steps.len()).sum();
                info!(binding = %binding.name, steps, "Binding run succeeded");
                if binding.notify_on_change {
                    notifier.notify(&binding.name, &changed);
                }
            }
            Ok(Err(failure)) => {
                error!(
                    binding = %binding.name,
                    task = %failure.task,
                    error = %failure.cause,
                    "Binding run failed; still watching"
                );
            }
            Err(payload) => {
                error!(
                    binding = %binding.name,
                    error = %panic_message(payload.as_ref()),
                    "Binding run panicked; still watching"
                );
            }
        }

        let mut inner = slot.lock();
        if inner.state == SlotState::Dirty {
            inner.state = SlotState::Running;
            continue;
        }
        inner.state = SlotState::Idle;
        break;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

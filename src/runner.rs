//! Task execution.
//!
//! A run expands the requested task into an ordered list of leaf steps
//! before anything executes, so cyclic or dangling composites fail without
//! invoking a single delegate. Steps then run one at a time: each leaf's
//! configuration is resolved against the [`ConfigStore`] and handed to its
//! delegate. The first failure ends the run.

use crate::config::ConfigStore;
use crate::delegates::{DelegateContext, DelegateSet};
use crate::error::{PipelineError, TaskFailure};
use crate::paths::ProjectRoot;
use crate::registry::{LeafTask, TaskRegistry, TaskSpec};
use crate::template;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A leaf scheduled for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStep {
    pub task: String,
    /// Composites leading from the top-level task to this leaf.
    pub chain: Vec<String>,
    pub leaf: LeafTask,
}

/// Outcome of one executed leaf.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub task: String,
    pub delegate: String,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub task: String,
    pub steps: Vec<StepReport>,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Runs named tasks against a fixed registry, delegate set and store.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    registry: Arc<TaskRegistry>,
    delegates: Arc<DelegateSet>,
    store: ConfigStore,
    root: ProjectRoot,
}

impl TaskRunner {
    pub fn new(
        registry: Arc<TaskRegistry>,
        delegates: Arc<DelegateSet>,
        store: ConfigStore,
        root: ProjectRoot,
    ) -> Self {
        Self {
            registry,
            delegates,
            store,
            root,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn delegates(&self) -> &DelegateSet {
        &self.delegates
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn root(&self) -> &ProjectRoot {
        &self.root
    }

    /// Expand `name` into its leaf steps in execution order.
    ///
    /// A composite reached again while it is still being expanded is a
    /// cycle. Reaching the same task twice through different branches is not.
    pub fn plan(&self, name: &str) -> Result<Vec<PlannedStep>, TaskFailure> {
        let mut steps = Vec::new();
        let mut chain = Vec::new();
        let mut in_progress = HashSet::new();
        self.expand(name, &mut chain, &mut in_progress, &mut steps)?;
        Ok(steps)
    }

    fn expand(
        &self,
        name: &str,
        chain: &mut Vec<String>,
        in_progress: &mut HashSet<String>,
        steps: &mut Vec<PlannedStep>,
    ) -> Result<(), TaskFailure> {
        if in_progress.contains(name) {
            return Err(TaskFailure::new(
                name,
                chain.clone(),
                PipelineError::cyclic_task(chain, name),
            ));
        }

        let spec = self
            .registry
            .resolve_task(name)
            .map_err(|e| TaskFailure::new(name, chain.clone(), e))?;

        match spec {
            TaskSpec::Leaf(leaf) => steps.push(PlannedStep {
                task: name.to_string(),
                chain: chain.clone(),
                leaf: leaf.clone(),
            }),
            TaskSpec::Composite(composite) => {
                in_progress.insert(name.to_string());
                chain.push(name.to_string());
                for step in &composite.steps {
                    self.expand(step, chain, in_progress, steps)?;
                }
                chain.pop();
                in_progress.remove(name);
            }
        }
        Ok(())
    }

    /// Run a task to completion, stopping at the first failing step.
    pub fn run(&self, name: &str) -> Result<RunReport, TaskFailure> {
        let started = Instant::now();
        let plan = self.plan(name)?;
        debug!(task = %name, steps = plan.len(), "Planned run");

        let mut reports = Vec::with_capacity(plan.len());
        for step in &plan {
            reports.push(self.execute(step)?);
        }

        let duration = started.elapsed();
        info!(
            task = %name,
            steps = reports.len(),
            duration_ms = duration.as_millis() as u64,
            "Task finished"
        );
        Ok(RunReport {
            task: name.to_string(),
            steps: reports,
            duration,
        })
    }

    /// Run several top-level tasks in order, stopping at the first failure.
    pub fn run_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<RunReport>, TaskFailure> {
        names.iter().map(|name| self.run(name.as_ref())).collect()
    }

    fn execute(&self, step: &PlannedStep) -> Result<StepReport, TaskFailure> {
        let fail = |cause: PipelineError| {
            warn!(task = %step.task, error = %cause, "Task failed");
            TaskFailure::new(step.task.clone(), step.chain.clone(), cause)
        };

        info!(task = %step.task, delegate = %step.leaf.delegate, "Running task");

        let payload = step.leaf.config.payload(&self.store).map_err(fail)?;
        let config = if template::has_tokens(&payload) {
            template::resolve(&payload, &self.store).map_err(fail)?
        } else {
            payload
        };
        let delegate = self
            .delegates
            .get(&step.leaf.delegate)
            .ok_or_else(|| fail(PipelineError::unknown_delegate(&step.leaf.delegate)))?;

        let ctx = DelegateContext::new(self.root.clone(), step.task.clone());
        let started = Instant::now();
        delegate
            .invoke(&config, &ctx)
            .map_err(|e| fail(PipelineError::delegate_failure(&step.leaf.delegate, format!("{:#}", e))))?;
        let duration = started.elapsed();

        debug!(
            task = %step.task,
            duration_ms = duration.as_millis() as u64,
            "Task step succeeded"
        );
        Ok(StepReport {
            task: step.task.clone(),
            delegate: step.leaf.delegate.clone(),
            duration,
        })
    }
}

//! Task registry: task name to leaf or composite specification.

use crate::config::{ConfigStore, ConfigValue};
use crate::error::{PipelineError, PipelineResult};
use crate::template;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Where a leaf task gets its configuration payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskConfig {
    /// Payload written inline with the task.
    Inline(ConfigValue),
    /// Payload read from the store at a dotted path when the task runs.
    Key(String),
}

impl TaskConfig {
    /// Fetch the unresolved payload. A missing store key is `InvalidConfig`.
    pub fn payload(&self, store: &ConfigStore) -> PipelineResult<ConfigValue> {
        match self {
            TaskConfig::Inline(value) => Ok(value.clone()),
            TaskConfig::Key(path) => store.require(path).cloned(),
        }
    }
}

/// One external tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafTask {
    /// Delegate name looked up in the [`crate::delegates::DelegateSet`].
    pub delegate: String,
    pub config: TaskConfig,
}

/// An ordered alias for other tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeTask {
    pub steps: Vec<String>,
}

/// A registered task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskSpec {
    Leaf(LeafTask),
    Composite(CompositeTask),
}

impl TaskSpec {
    /// Leaf with an inline payload.
    pub fn leaf(delegate: impl Into<String>, config: ConfigValue) -> Self {
        TaskSpec::Leaf(LeafTask {
            delegate: delegate.into(),
            config: TaskConfig::Inline(config),
        })
    }

    /// Leaf whose payload is read from the store at `key`.
    pub fn leaf_from_key(delegate: impl Into<String>, key: impl Into<String>) -> Self {
        TaskSpec::Leaf(LeafTask {
            delegate: delegate.into(),
            config: TaskConfig::Key(key.into()),
        })
    }

    pub fn composite<S: Into<String>>(steps: impl IntoIterator<Item = S>) -> Self {
        TaskSpec::Composite(CompositeTask {
            steps: steps.into_iter().map(Into::into).collect(),
        })
    }
}

/// A registered task with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct TaskEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub spec: TaskSpec,
}

/// Problem found by [`TaskRegistry::check`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckIssue {
    pub task: String,
    pub message: String,
}

/// Name-unique table of tasks, in registration order.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    entries: Vec<TaskEntry>,
    index: HashMap<String, usize>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Fails with `DuplicateTask` if the name is taken.
    pub fn register(&mut self, name: impl Into<String>, spec: TaskSpec) -> PipelineResult<()> {
        self.register_described(name, spec, None)
    }

    /// Register a task with a description shown in listings.
    pub fn register_described(
        &mut self,
        name: impl Into<String>,
        spec: TaskSpec,
        description: Option<String>,
    ) -> PipelineResult<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(PipelineError::duplicate_task(&name));
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(TaskEntry {
            name,
            description,
            spec,
        });
        Ok(())
    }

    /// Look up a task. Fails with `UnknownTask` if absent.
    pub fn resolve_task(&self, name: &str) -> PipelineResult<&TaskSpec> {
        self.get(name)
            .map(|entry| &entry.spec)
            .ok_or_else(|| PipelineError::unknown_task(name))
    }

    pub fn get(&self, name: &str) -> Option<&TaskEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tasks in registration order.
    pub fn entries(&self) -> &[TaskEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Static validation on demand: dangling steps, composite cycles,
    /// unknown delegates and, when a store is given, missing config keys.
    ///
    /// The runner does not depend on this; it detects the same problems
    /// lazily when a task is run.
    pub fn check(&self, known_delegates: &HashSet<String>, store: Option<&ConfigStore>) -> Vec<CheckIssue> {
        let mut issues = Vec::new();

        for entry in &self.entries {
            match &entry.spec {
                TaskSpec::Composite(composite) => {
                    for step in &composite.steps {
                        if !self.contains(step) {
                            issues.push(CheckIssue {
                                task: entry.name.clone(),
                                message: format!("Step '{}' is not a registered task", step),
                            });
                        }
                    }
                }
                TaskSpec::Leaf(leaf) => {
                    if !known_delegates.contains(&leaf.delegate) {
                        issues.push(CheckIssue {
                            task: entry.name.clone(),
                            message: format!("Delegate '{}' is not registered", leaf.delegate),
                        });
                    }
                    if let Some(store) = store {
                        issues.extend(self.check_leaf_config(&entry.name, leaf, store));
                    }
                }
            }
        }

        // Keyed by cycle members so a cycle is reported once whichever task reaches it.
        let mut reported: HashSet<Vec<String>> = HashSet::new();
        for entry in &self.entries {
            let mut stack = Vec::new();
            let Some(cycle) = self.find_cycle(&entry.name, &mut stack) else {
                continue;
            };
            let start = stack.iter().position(|s| *s == cycle).unwrap_or(0);
            let mut members = stack[start..].to_vec();
            members.sort();
            if reported.insert(members) {
                issues.push(CheckIssue {
                    task: cycle.clone(),
                    message: format!("Task cycle: {} -> {}", stack.join(" -> "), cycle),
                });
            }
        }

        issues
    }

    fn check_leaf_config(&self, name: &str, leaf: &LeafTask, store: &ConfigStore) -> Vec<CheckIssue> {
        let payload = match leaf.config.payload(store) {
            Ok(payload) => payload,
            Err(e) => {
                return vec![CheckIssue {
                    task: name.to_string(),
                    message: e.message,
                }];
            }
        };
        // Report every dangling reference, not only the first one resolve hits.
        let missing: Vec<CheckIssue> = template::references(&payload)
            .into_iter()
            .filter(|path| store.lookup(path).is_none())
            .map(|path| CheckIssue {
                task: name.to_string(),
                message: PipelineError::unresolved_reference(&path).message,
            })
            .collect();
        if !missing.is_empty() {
            return missing;
        }
        match template::resolve(&payload, store) {
            Ok(_) => Vec::new(),
            Err(e) => vec![CheckIssue {
                task: name.to_string(),
                message: e.message,
            }],
        }
    }

    /// Depth-first search for a composite cycle starting at `name`.
    ///
    /// On success `stack` holds the path up to the repeated task.
    fn find_cycle(&self, name: &str, stack: &mut Vec<String>) -> Option<String> {
        if stack.iter().any(|s| s == name) {
            return Some(name.to_string());
        }
        let Some(TaskSpec::Composite(composite)) = self.get(name).map(|e| &e.spec) else {
            return None;
        };
        stack.push(name.to_string());
        for step in &composite.steps {
            if let Some(cycle) = self.find_cycle(step, stack) {
                return Some(cycle);
            }
        }
        stack.pop();
        None
    }
}

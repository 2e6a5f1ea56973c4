//! Delegates: the external collaborators a leaf task invokes by name.
//!
//! The orchestrator treats every delegate as opaque. It hands over the
//! leaf's fully resolved configuration and reports success or failure.
//! Built-in delegates cover plain file plumbing (clean, copy, concat, bump)
//! and running external programs (exec). Linters, compilers and minifiers
//! are external programs registered through [`CommandDelegate`].

mod bump;
mod clean;
mod concat;
mod copy;
mod exec;
pub mod files;

pub use bump::BumpDelegate;
pub use clean::CleanDelegate;
pub use concat::ConcatDelegate;
pub use copy::CopyDelegate;
pub use exec::{CommandDelegate, ExecDelegate};

use crate::config::ConfigValue;
use crate::paths::ProjectRoot;
use anyhow::Result;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Context passed to every delegate invocation.
#[derive(Debug, Clone)]
pub struct DelegateContext {
    /// Project root that relative paths resolve against.
    pub root: ProjectRoot,
    /// Name of the leaf task being run.
    pub task: String,
}

impl DelegateContext {
    pub fn new(root: ProjectRoot, task: impl Into<String>) -> Self {
        Self {
            root,
            task: task.into(),
        }
    }
}

/// Contract every pluggable tool satisfies.
///
/// Invocation is synchronous; the runner waits for it to return before
/// starting the next step.
pub trait Delegate: Send + Sync {
    fn invoke(&self, config: &ConfigValue, ctx: &DelegateContext) -> Result<()>;
}

impl<F> Delegate for F
where
    F: Fn(&ConfigValue, &DelegateContext) -> Result<()> + Send + Sync,
{
    fn invoke(&self, config: &ConfigValue, ctx: &DelegateContext) -> Result<()> {
        self(config, ctx)
    }
}

/// Delegates available to a run, keyed by name.
#[derive(Clone, Default)]
pub struct DelegateSet {
    delegates: BTreeMap<String, Arc<dyn Delegate>>,
}

impl DelegateSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in delegates: `clean`, `copy`, `concat`, `exec`, `bump`.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        set.insert("clean", CleanDelegate);
        set.insert("copy", CopyDelegate);
        set.insert("concat", ConcatDelegate);
        set.insert("exec", ExecDelegate);
        set.insert("bump", BumpDelegate);
        set
    }

    /// Register or replace a delegate.
    pub fn insert(&mut self, name: impl Into<String>, delegate: impl Delegate + 'static) {
        self.delegates.insert(name.into(), Arc::new(delegate));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Delegate>> {
        self.delegates.get(name)
    }

    pub fn names(&self) -> HashSet<String> {
        self.delegates.keys().cloned().collect()
    }
}

impl std::fmt::Debug for DelegateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.delegates.keys()).finish()
    }
}

//! Pipeline file schema.
//!
//! A pipeline file is YAML:
//!
//! ```yaml
//! imports:
//!   pkg: package.json
//! config:
//!   build_dir: build
//!   concat:
//!     build_js: { src: ["src/**/*.js"], dest: "<%= build_dir %>/<%= pkg.name %>.js" }
//! delegates:
//!   jshint: { command: jshint }
//! tasks:
//!   lint: { delegate: jshint, config: { src: ["src/**/*.js"] } }
//!   concat: { delegate: concat, targets: [build_js] }
//!   build: [lint, "concat:build_js"]
//! watch:
//!   bindings:
//!     - patterns: ["src/**/*.js"]
//!       tasks: [lint, "concat:build_js"]
//!       notify: true
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default project override file, looked up next to the pipeline file.
pub const DEFAULT_OVERRIDE_FILE: &str = "build.config.yaml";

/// Top-level pipeline file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineFile {
    /// Base configuration mapping that templates resolve against.
    #[serde(default)]
    pub config: Map<String, Value>,

    /// Files loaded into the base mapping under the given key (JSON or YAML).
    #[serde(default)]
    pub imports: BTreeMap<String, PathBuf>,

    /// Project override file, relative to the pipeline file.
    #[serde(default)]
    pub override_file: Option<PathBuf>,

    /// External programs reachable by delegate name.
    #[serde(default)]
    pub delegates: BTreeMap<String, CommandDelegateDef>,

    /// Task definitions in declaration order; values parse as [`TaskDef`].
    #[serde(default)]
    pub tasks: Map<String, Value>,

    /// Alternative task tables overlaid on `tasks` when selected.
    #[serde(default)]
    pub presets: BTreeMap<String, PresetDef>,

    /// Watch mode settings.
    #[serde(default)]
    pub watch: WatchSection,
}

/// An external program registered as a delegate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDelegateDef {
    /// Program to run.
    pub command: String,

    /// Arguments placed before any per-task arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

/// A named alternative task table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Task definitions that replace or extend the base table by name.
    #[serde(default)]
    pub tasks: Map<String, Value>,
}

/// One task definition as written in the pipeline file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskDef {
    /// `build: [clean, lint]`
    Steps(Vec<String>),

    /// `build: { steps: [clean, lint], description: ... }`
    Composite {
        steps: Vec<String>,
        #[serde(default)]
        description: Option<String>,
    },

    /// `concat: { delegate: concat, targets: [build_js, build_css] }`
    ///
    /// Expands to one leaf per target (`concat:build_js`, ...) plus a
    /// composite named after the task running every target in order.
    Targets {
        delegate: String,
        targets: TargetsDef,
        #[serde(default)]
        description: Option<String>,
    },

    /// `lint: { delegate: jshint, config: {...} }`
    ///
    /// Without `config`, the leaf reads its configuration from the store at
    /// the task's name (`recess:build` reads `recess.build`).
    Leaf {
        delegate: String,
        #[serde(default)]
        config: Option<Value>,
        #[serde(default)]
        description: Option<String>,
    },
}

/// Targets of a multi-target task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetsDef {
    /// Target names; each target's config lives in the store at `task.target`.
    Names(Vec<String>),
    /// Inline target configs.
    Inline(Map<String, Value>),
}

/// Watch mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSection {
    /// Tasks run once before watching starts.
    #[serde(default = "default_initial_tasks")]
    pub initial: Vec<String>,

    /// Debounce window for coalescing file events.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// File touched after a notifying binding succeeds (for live-reload servers).
    #[serde(default)]
    pub livereload_file: Option<PathBuf>,

    /// Relative paths never reported as changes.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    #[serde(default)]
    pub bindings: Vec<BindingDef>,
}

fn default_initial_tasks() -> Vec<String> {
    vec!["build".to_string()]
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_ignore() -> Vec<String> {
    vec![".git/**".to_string(), "node_modules/**".to_string()]
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            initial: default_initial_tasks(),
            debounce_ms: default_debounce_ms(),
            livereload_file: None,
            ignore: default_ignore(),
            bindings: Vec::new(),
        }
    }
}

/// A file-pattern to task-list binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingDef {
    /// Optional label used in logs; defaults to the binding's index.
    #[serde(default)]
    pub name: Option<String>,

    /// Glob patterns relative to the project root. May contain templates.
    #[serde(alias = "files")]
    pub patterns: Vec<String>,

    /// Tasks run in order when a matching file changes.
    pub tasks: Vec<String>,

    /// Emit a completion notification after a successful run.
    #[serde(default, alias = "livereload")]
    pub notify: bool,
}

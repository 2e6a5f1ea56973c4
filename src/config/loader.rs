//! Pipeline loader with tier-based overrides.
//!
//! Reads the pipeline file, its imports and the override tiers, then builds
//! the store, task registry and delegate set a run needs.

use super::merge::merge_all;
use super::store::ConfigStore;
use super::types::{DEFAULT_OVERRIDE_FILE, PipelineFile, PresetDef, TargetsDef, TaskDef};
use crate::delegates::{CommandDelegate, DelegateSet};
use crate::paths::ProjectRoot;
use crate::registry::{CheckIssue, TaskRegistry, TaskSpec};
use crate::runner::TaskRunner;
use crate::watch::{LogNotifier, Notifier, TouchNotifier, WatchBinding, WatchPaths};
use anyhow::{Context, Result, bail};
use glob::Pattern;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pipeline file names tried in the working directory, in order.
pub const PIPELINE_FILE_NAMES: [&str; 2] = ["taskwright.yaml", "taskwright.yml"];

/// Name of the override file inside the user directory.
pub const USER_OVERRIDE_FILE: &str = "overrides.yaml";

/// Override tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// `config:` section and imports of the pipeline file
    Base = 0,
    /// Project override file next to the pipeline file
    Project = 1,
    /// User override file (~/.taskwright/overrides.yaml)
    User = 2,
    /// `--set key=value` arguments (highest priority)
    CommandLine = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Base => write!(f, "base"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::CommandLine => write!(f, "command-line"),
        }
    }
}

/// A tier that contributed keys to the store.
#[derive(Debug, Clone)]
pub struct LoadedTier {
    pub tier: ConfigTier,
    pub source: Option<PathBuf>,
    pub keys: Vec<String>,
}

/// Where the pipeline file and user overrides live.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    pub pipeline_file: PathBuf,
    /// User-level override directory
    pub user_dir: Option<PathBuf>,
}

impl PipelinePaths {
    /// Discover paths from an explicit file, the environment and defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        // User dir: TASKWRIGHT_USER_DIR or ~/.taskwright
        let user_dir = std::env::var("TASKWRIGHT_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".taskwright")));

        let pipeline_file = match explicit {
            Some(path) => path.to_path_buf(),
            None => match std::env::var("TASKWRIGHT_FILE") {
                Ok(path) => PathBuf::from(path),
                Err(_) => PIPELINE_FILE_NAMES
                    .iter()
                    .map(PathBuf::from)
                    .find(|p| p.is_file())
                    .with_context(|| {
                        format!(
                            "No pipeline file found (looked for {}); use --file",
                            PIPELINE_FILE_NAMES.join(", ")
                        )
                    })?,
            },
        };

        if !pipeline_file.is_file() {
            bail!("Pipeline file not found: {}", pipeline_file.display());
        }

        Ok(Self {
            pipeline_file,
            user_dir,
        })
    }

    /// Create paths with an explicit pipeline file and user directory.
    pub fn with_file(pipeline_file: impl Into<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            pipeline_file: pipeline_file.into(),
            user_dir,
        }
    }

    /// Directory containing the pipeline file.
    pub fn root_dir(&self) -> PathBuf {
        match self.pipeline_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Options supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Preset whose task table is overlaid on the base tasks.
    pub preset: Option<String>,
    /// Top-level keys from `--set`, in order.
    pub set: Vec<(String, Value)>,
}

/// Loaded pipeline: everything needed to run, list or watch tasks.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: PipelinePaths,
    file: PipelineFile,
    root: ProjectRoot,
    tiers: Vec<LoadedTier>,
    store: ConfigStore,
    registry: Arc<TaskRegistry>,
    delegates: Arc<DelegateSet>,
}

impl ConfigLoader {
    /// Load the pipeline file and every override tier.
    pub fn load(paths: PipelinePaths, options: &LoadOptions) -> Result<Self> {
        let content = std::fs::read_to_string(&paths.pipeline_file)
            .with_context(|| format!("Failed to read {}", paths.pipeline_file.display()))?;
        let file: PipelineFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", paths.pipeline_file.display()))?;
        Self::from_pipeline(file, paths, options)
    }

    /// Build from an already parsed pipeline file.
    pub fn from_pipeline(
        file: PipelineFile,
        paths: PipelinePaths,
        options: &LoadOptions,
    ) -> Result<Self> {
        let root = ProjectRoot::new(paths.root_dir());
        let mut tiers = Vec::new();

        // Tier 1: base config plus imports
        let mut base = file.config.clone();
        for (key, import) in &file.imports {
            let path = root.resolve(import);
            let value = read_value(&path)
                .with_context(|| format!("Failed to import '{}' from {}", key, path.display()))?;
            if base.contains_key(key) {
                warn!(key = %key, "Import replaces a key from the config section");
            }
            base.insert(key.clone(), value);
        }
        tiers.push(LoadedTier {
            tier: ConfigTier::Base,
            source: Some(paths.pipeline_file.clone()),
            keys: base.keys().cloned().collect(),
        });

        let mut overrides: Vec<Map<String, Value>> = Vec::new();

        // Tier 2: project override file
        let (override_path, required) = match file.override_file {
            Some(ref path) => (root.resolve(path), true),
            None => (root.resolve(DEFAULT_OVERRIDE_FILE), false),
        };
        if override_path.is_file() {
            let map = read_mapping(&override_path)?;
            tiers.push(LoadedTier {
                tier: ConfigTier::Project,
                source: Some(override_path),
                keys: map.keys().cloned().collect(),
            });
            overrides.push(map);
        } else if required {
            bail!("Override file not found: {}", override_path.display());
        }

        // Tier 3: user override file
        if let Some(ref user_dir) = paths.user_dir {
            let user_file = user_dir.join(USER_OVERRIDE_FILE);
            if user_file.is_file() {
                let map = read_mapping(&user_file)?;
                tiers.push(LoadedTier {
                    tier: ConfigTier::User,
                    source: Some(user_file),
                    keys: map.keys().cloned().collect(),
                });
                overrides.push(map);
            }
        }

        // Tier 4: --set
        if !options.set.is_empty() {
            let map: Map<String, Value> = options.set.iter().cloned().collect();
            tiers.push(LoadedTier {
                tier: ConfigTier::CommandLine,
                source: None,
                keys: map.keys().cloned().collect(),
            });
            overrides.push(map);
        }

        for tier in &tiers {
            debug!(tier = %tier.tier, keys = ?tier.keys, "Loaded config tier");
        }
        let store = ConfigStore::build(base, merge_all(overrides));

        let tasks = match options.preset {
            Some(ref name) => apply_preset(&file.tasks, &file.presets, name)?,
            None => file.tasks.clone(),
        };
        let registry = build_registry(&tasks)?;
        let delegates = build_delegates(&file);

        info!(
            file = %paths.pipeline_file.display(),
            tasks = registry.len(),
            preset = options.preset.as_deref().unwrap_or("-"),
            "Pipeline loaded"
        );

        Ok(Self {
            paths,
            file,
            root,
            tiers,
            store,
            registry: Arc::new(registry),
            delegates: Arc::new(delegates),
        })
    }

    pub fn pipeline(&self) -> &PipelineFile {
        &self.file
    }

    pub fn root(&self) -> &ProjectRoot {
        &self.root
    }

    /// Tiers that contributed keys, lowest priority first.
    pub fn tiers(&self) -> &[LoadedTier] {
        &self.tiers
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn delegates(&self) -> &DelegateSet {
        &self.delegates
    }

    /// A runner over this pipeline's tasks, delegates and store.
    pub fn runner(&self) -> TaskRunner {
        TaskRunner::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.delegates),
            self.store.clone(),
            self.root.clone(),
        )
    }

    /// Static validation of the task table.
    pub fn check(&self) -> Vec<CheckIssue> {
        let mut issues = self
            .registry
            .check(&self.delegates.names(), Some(&self.store));
        for (index, binding) in self.file.watch.bindings.iter().enumerate() {
            for task in &binding.tasks {
                if !self.registry.contains(task) {
                    issues.push(CheckIssue {
                        task: binding_name(binding.name.as_deref(), index),
                        message: format!("Watch binding runs unknown task '{}'", task),
                    });
                }
            }
        }
        issues
    }

    /// Compile the watch bindings, resolving templates in their patterns.
    pub fn watch_bindings(&self) -> Result<Vec<WatchBinding>> {
        self.file
            .watch
            .bindings
            .iter()
            .enumerate()
            .map(|(index, def)| {
                let name = binding_name(def.name.as_deref(), index);
                if let Some(task) = def.tasks.iter().find(|t| !self.registry.contains(t)) {
                    bail!("Watch binding '{}' runs unknown task '{}'", name, task);
                }
                Ok(WatchBinding::new(
                    name,
                    &def.patterns,
                    def.tasks.clone(),
                    def.notify,
                    &self.store,
                )?)
            })
            .collect()
    }

    /// What the file watcher observes and ignores.
    pub fn watch_paths(&self) -> Result<WatchPaths> {
        let mut ignore = Vec::with_capacity(self.file.watch.ignore.len() + 1);
        for raw in &self.file.watch.ignore {
            ignore.push(
                Pattern::new(raw).with_context(|| format!("Invalid ignore pattern '{}'", raw))?,
            );
        }
        // The live-reload file is written by us; never treat it as a change.
        if let Some(ref file) = self.file.watch.livereload_file
            && let Some(rel) = self.root.relative(&self.root.resolve(file))
        {
            ignore.push(Pattern::new(&Pattern::escape(&rel))?);
        }
        let paths = self
            .config_sources()
            .into_iter()
            .fold(WatchPaths::new(self.root.clone()), WatchPaths::with_config_file);
        Ok(paths.with_ignore(ignore))
    }

    /// Files whose contents feed tasks or the store: the pipeline file, its
    /// imports and the project override file (watched even before it exists).
    pub fn config_sources(&self) -> Vec<PathBuf> {
        let mut sources = vec![self.paths.pipeline_file.clone()];
        sources.extend(self.file.imports.values().map(|import| self.root.resolve(import)));
        sources.push(match self.file.override_file {
            Some(ref path) => self.root.resolve(path),
            None => self.root.resolve(DEFAULT_OVERRIDE_FILE),
        });
        sources
    }

    /// Notifier for bindings with `notify` set.
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        match self.file.watch.livereload_file {
            Some(ref file) => Arc::new(TouchNotifier::new(self.root.resolve(file))),
            None => Arc::new(LogNotifier),
        }
    }
}

fn binding_name(name: Option<&str>, index: usize) -> String {
    name.map(str::to_string)
        .unwrap_or_else(|| format!("binding-{}", index + 1))
}

/// Read a JSON or YAML file (chosen by extension) into a value.
fn read_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let value = if is_json {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(value)
}

/// Read an override file, which must hold a mapping (an empty file is an empty mapping).
fn read_mapping(path: &Path) -> Result<Map<String, Value>> {
    match read_value(path).with_context(|| format!("Failed to parse {}", path.display()))? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => bail!(
            "{} must contain a mapping, found {}",
            path.display(),
            type_name(&other)
        ),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Overlay a preset's task table on the base tasks.
///
/// Tasks the preset names replace base tasks in place; new ones are appended.
pub fn apply_preset(
    tasks: &Map<String, Value>,
    presets: &BTreeMap<String, PresetDef>,
    name: &str,
) -> Result<Map<String, Value>> {
    let Some(preset) = presets.get(name) else {
        let available: Vec<&str> = presets.keys().map(String::as_str).collect();
        if available.is_empty() {
            bail!("Unknown preset '{}': the pipeline defines no presets", name);
        }
        bail!(
            "Unknown preset '{}' (available: {})",
            name,
            available.join(", ")
        );
    };
    let mut merged = tasks.clone();
    for (task, def) in &preset.tasks {
        merged.insert(task.clone(), def.clone());
    }
    Ok(merged)
}

/// Build the registry from raw task definitions, in declaration order.
pub fn build_registry(tasks: &Map<String, Value>) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();
    for (name, raw) in tasks {
        let def: TaskDef = serde_json::from_value(raw.clone())
            .with_context(|| format!("Invalid definition for task '{}'", name))?;
        match def {
            TaskDef::Steps(steps) => registry.register(name.clone(), TaskSpec::composite(steps))?,
            TaskDef::Composite { steps, description } => {
                registry.register_described(name.clone(), TaskSpec::composite(steps), description)?
            }
            TaskDef::Targets {
                delegate,
                targets,
                description,
            } => {
                let mut names = Vec::new();
                match targets {
                    TargetsDef::Names(targets) => {
                        for target in targets {
                            let key = format!("{}.{}", config_key(name), target);
                            let task = format!("{}:{}", name, target);
                            registry.register(task.clone(), TaskSpec::leaf_from_key(&delegate, key))?;
                            names.push(task);
                        }
                    }
                    TargetsDef::Inline(targets) => {
                        for (target, config) in targets {
                            let task = format!("{}:{}", name, target);
                            registry.register(task.clone(), TaskSpec::leaf(&delegate, config))?;
                            names.push(task);
                        }
                    }
                }
                registry.register_described(name.clone(), TaskSpec::composite(names), description)?;
            }
            TaskDef::Leaf {
                delegate,
                config,
                description,
            } => {
                let spec = match config {
                    Some(config) => TaskSpec::leaf(delegate, config),
                    None => TaskSpec::leaf_from_key(delegate, config_key(name)),
                };
                registry.register_described(name.clone(), spec, description)?;
            }
        }
    }
    Ok(registry)
}

/// Store key holding a task's configuration: `recess:build` reads `recess.build`.
fn config_key(task: &str) -> String {
    task.replace(':', ".")
}

/// Built-in delegates plus the pipeline's command delegates.
pub fn build_delegates(file: &PipelineFile) -> DelegateSet {
    let mut set = DelegateSet::builtin();
    let builtin = set.names();
    for (name, def) in &file.delegates {
        if builtin.contains(name) {
            warn!(delegate = %name, "Command delegate shadows a built-in delegate");
        }
        set.insert(
            name.clone(),
            CommandDelegate::new(def.command.clone(), def.args.clone()),
        );
    }
    set
}

/// Parse a `--set key=value` argument. The value is read as a YAML scalar.
pub fn parse_set(arg: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = arg.split_once('=') else {
        bail!("Expected key=value, got '{}'", arg);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("Empty key in '{}'", arg);
    }
    if key.contains('.') {
        bail!(
            "--set only replaces top-level keys; '{}' contains '.' (overrides are shallow)",
            key
        );
    }
    let value = if raw.is_empty() {
        Value::String(String::new())
    } else {
        serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::watch::WatchEvent;
    use crate::watch::watcher::classify_paths;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_pipeline(temp: &TempDir, yaml: &str) -> PipelinePaths {
        let file = temp.path().join("taskwright.yaml");
        fs::write(&file, yaml).unwrap();
        PipelinePaths::with_file(file, Some(temp.path().join("user")))
    }

    #[test]
    fn test_base_config_only() {
        let temp = TempDir::new().unwrap();
        let paths = write_pipeline(&temp, "config:\n  build_dir: build\n");

        let loader = ConfigLoader::load(paths, &LoadOptions::default()).unwrap();

        assert_eq!(loader.store().lookup("build_dir"), Some(&json!("build")));
        assert_eq!(loader.tiers().len(), 1);
        assert_eq!(loader.tiers()[0].tier, ConfigTier::Base);
    }

    #[test]
    fn test_override_tiers_are_shallow_and_ordered() {
        let temp = TempDir::new().unwrap();
        let paths = write_pipeline(
            &temp,
            "config:\n  build_dir: build\n  dist:\n    js: a.js\n    css: a.css\n",
        );
        fs::write(temp.path().join("build.config.yaml"), "build_dir: out\ndist:\n  js: b.js\n").unwrap();
        fs::create_dir_all(temp.path().join("user")).unwrap();
        fs::write(temp.path().join("user/overrides.yaml"), "build_dir: mine\n").unwrap();

        let options = LoadOptions {
            preset: None,
            set: vec![parse_set("build_dir=cli").unwrap()],
        };
        let loader = ConfigLoader::load(paths, &options).unwrap();

        assert_eq!(loader.store().lookup("build_dir"), Some(&json!("cli")));
        // dist replaced as a whole, not merged
        assert_eq!(loader.store().lookup("dist"), Some(&json!({"js": "b.js"})));
        let tiers: Vec<ConfigTier> = loader.tiers().iter().map(|t| t.tier).collect();
        assert_eq!(
            tiers,
            vec![ConfigTier::Base, ConfigTier::Project, ConfigTier::User, ConfigTier::CommandLine]
        );
    }

    #[test]
    fn test_explicit_override_file_must_exist() {
        let temp = TempDir::new().unwrap();
        let paths = write_pipeline(&temp, "override_file: custom.yaml\n");
        let err = ConfigLoader::load(paths, &LoadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("custom.yaml"));
    }

    #[test]
    fn test_override_must_be_mapping() {
        let temp = TempDir::new().unwrap();
        let paths = write_pipeline(&temp, "config: {}\n");
        fs::write(temp.path().join("build.config.yaml"), "- a\n- b\n").unwrap();
        let err = ConfigLoader::load(paths, &LoadOptions::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("must contain a mapping"));
    }

    #[test]
    fn test_imports_json() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("package.json"), r#"{"name": "app", "version": "1.0.0"}"#).unwrap();
        let paths = write_pipeline(&temp, "imports:\n  pkg: package.json\n");

        let loader = ConfigLoader::load(paths, &LoadOptions::default()).unwrap();
        assert_eq!(loader.store().lookup("pkg.name"), Some(&json!("app")));
    }

    #[test]
    fn test_imports_and_override_file_trigger_reload() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("package.json"), r#"{"name": "app", "version": "1.0.0"}"#).unwrap();
        let paths = write_pipeline(&temp, "imports:\n  pkg: package.json\n");
        let loader = ConfigLoader::load(paths, &LoadOptions::default()).unwrap();

        let watch = loader.watch_paths().unwrap();
        let root = loader.root().path().to_path_buf();
        for file in ["taskwright.yaml", "package.json", "build.config.yaml"] {
            assert_eq!(
                classify_paths(&[root.join(file)], &watch),
                vec![WatchEvent::PipelineChanged],
                "{}",
                file
            );
        }
        assert_eq!(
            classify_paths(&[root.join("src/app.js")], &watch),
            vec![WatchEvent::Changed(vec!["src/app.js".to_string()])]
        );
    }

    #[test]
    fn test_task_shapes_registered() {
        let temp = TempDir::new().unwrap();
        let paths = write_pipeline(
            &temp,
            r#"
config:
  concat:
    js: { src: [a.js], dest: out.js }
tasks:
  clean: { delegate: clean, config: [build] }
  concat: { delegate: concat, targets: [js] }
  less: { delegate: exec, targets: { dev: { command: lessc }, prod: { command: lessc } } }
  build: [clean, concat]
  deploy: { steps: [build], description: Ship it }
"#,
        );
        let loader = ConfigLoader::load(paths, &LoadOptions::default()).unwrap();
        let registry = loader.registry();

        let names: Vec<&str> = registry.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["clean", "concat:js", "concat", "less:dev", "less:prod", "less", "build", "deploy"]
        );
        assert_eq!(
            registry.resolve_task("less").unwrap(),
            &TaskSpec::composite(["less:dev", "less:prod"])
        );
        assert_eq!(
            registry.resolve_task("concat:js").unwrap(),
            &TaskSpec::leaf_from_key("concat", "concat.js")
        );
        assert_eq!(registry.get("deploy").unwrap().description.as_deref(), Some("Ship it"));
    }

    #[test]
    fn test_leaf_without_config_reads_task_key() {
        let registry = build_registry(
            json!({"recess:build": {"delegate": "exec"}})
                .as_object()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(
            registry.resolve_task("recess:build").unwrap(),
            &TaskSpec::leaf_from_key("exec", "recess.build")
        );
    }

    #[test]
    fn test_duplicate_from_target_expansion() {
        let tasks = json!({
            "concat": {"delegate": "concat", "targets": ["js"]},
            "concat:js": ["concat"]
        });
        let err = build_registry(tasks.as_object().unwrap()).unwrap_err();
        let cause = err.downcast_ref::<crate::error::PipelineError>().unwrap();
        assert_eq!(cause.code, ErrorCode::DuplicateTask);
    }

    #[test]
    fn test_preset_overlay() {
        let temp = TempDir::new().unwrap();
        let paths = write_pipeline(
            &temp,
            r#"
tasks:
  lint: { delegate: exec, config: { command: "true" } }
  build: [lint]
presets:
  fast:
    tasks:
      build: []
"#,
        );
        let options = LoadOptions {
            preset: Some("fast".to_string()),
            set: Vec::new(),
        };
        let loader = ConfigLoader::load(paths.clone(), &options).unwrap();
        assert_eq!(
            loader.registry().resolve_task("build").unwrap(),
            &TaskSpec::composite(Vec::<String>::new())
        );

        let options = LoadOptions {
            preset: Some("slow".to_string()),
            set: Vec::new(),
        };
        let err = ConfigLoader::load(paths, &options).unwrap_err();
        assert!(err.to_string().contains("available: fast"));
    }

    #[test]
    fn test_watch_bindings_compiled() {
        let temp = TempDir::new().unwrap();
        let paths = write_pipeline(
            &temp,
            r#"
config:
  src: app
tasks:
  lint: { delegate: exec, config: { command: "true" } }
watch:
  livereload_file: .reload
  bindings:
    - files: ["<%= src %>/**/*.js"]
      tasks: [lint]
      livereload: true
"#,
        );
        let loader = ConfigLoader::load(paths, &LoadOptions::default()).unwrap();
        let bindings = loader.watch_bindings().unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].name, "binding-1");
        assert!(bindings[0].matches("app/x/y.js"));
        assert!(bindings[0].notify_on_change);

        let watch_paths = loader.watch_paths().unwrap();
        assert!(watch_paths.ignore.iter().any(|p| p.matches(".reload")));
        assert!(watch_paths.ignore.iter().any(|p| p.matches(".git/HEAD")));
    }

    #[test]
    fn test_watch_binding_unknown_task() {
        let temp = TempDir::new().unwrap();
        let paths = write_pipeline(
            &temp,
            "watch:\n  bindings:\n    - patterns: ['*.js']\n      tasks: [nope]\n",
        );
        let loader = ConfigLoader::load(paths, &LoadOptions::default()).unwrap();
        assert!(loader.watch_bindings().is_err());
        assert_eq!(loader.check().len(), 1);
    }

    #[test]
    fn test_parse_set() {
        assert_eq!(parse_set("port=8080").unwrap(), ("port".to_string(), json!(8080)));
        assert_eq!(parse_set("debug=true").unwrap(), ("debug".to_string(), json!(true)));
        assert_eq!(parse_set("dir=build/out").unwrap(), ("dir".to_string(), json!("build/out")));
        assert_eq!(parse_set("empty=").unwrap(), ("empty".to_string(), json!("")));
        assert!(parse_set("novalue").is_err());
        assert!(parse_set("=x").is_err());
        assert!(parse_set("a.b=1").is_err());
    }

    #[test]
    fn test_discover_explicit_missing() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yaml");
        assert!(PipelinePaths::discover(Some(&missing)).is_err());
    }
}

//! End-to-end tests: load a pipeline file from a scratch project and run
//! its tasks with the built-in delegates.

use std::fs;
use std::path::Path;
use taskwright::config::{ConfigLoader, LoadOptions, PipelinePaths, parse_set};
use taskwright::error::ErrorCode;
use tempfile::TempDir;

const PIPELINE: &str = r#"
imports:
  pkg: package.json

config:
  build_dir: build
  compile_dir: bin
  banner: "/* <%= pkg.name %> v<%= pkg.version %> */\n"
  concat:
    build_js:
      src: ["module.prefix", "<%= build_dir %>/src/**/*.js", "module.suffix"]
      dest: "<%= compile_dir %>/<%= pkg.name %>.js"
      options:
        banner: "<%= banner %>"

tasks:
  clean:
    delegate: clean
    config: ["<%= build_dir %>", "<%= compile_dir %>"]
  copy:
    delegate: copy
    description: Stage sources
    targets:
      build_js:
        files:
          - { src: ["src/**/*.js", "!src/**/*.spec.js"], dest: "<%= build_dir %>/" }
  concat:
    delegate: concat
    targets: [build_js]
  build: [clean, "copy:build_js"]
  compile: [concat]
  default: [build, compile]

presets:
  quick:
    description: Skip cleaning
    tasks:
      build: ["copy:build_js"]
"#;

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("taskwright.yaml"), PIPELINE).unwrap();
    fs::write(root.join("package.json"), r#"{"name": "app", "version": "0.3.1"}"#).unwrap();
    fs::write(root.join("module.prefix"), "(function(){").unwrap();
    fs::write(root.join("module.suffix"), "})();").unwrap();
    fs::create_dir_all(root.join("src/app")).unwrap();
    fs::write(root.join("src/app/app.js"), "var app;").unwrap();
    fs::write(root.join("src/app/app.spec.js"), "describe();").unwrap();
    fs::write(root.join("src/common.js"), "var common;").unwrap();
    temp
}

fn load(root: &Path, options: &LoadOptions) -> ConfigLoader {
    let paths = PipelinePaths::with_file(root.join("taskwright.yaml"), None);
    ConfigLoader::load(paths, options).unwrap()
}

#[test]
fn default_task_builds_and_compiles() {
    let temp = project();
    let root = temp.path();
    fs::create_dir_all(root.join("build/stale")).unwrap();
    fs::write(root.join("build/stale/old.js"), "old").unwrap();

    let loader = load(root, &LoadOptions::default());
    let reports = loader.runner().run_all(&["default"]).unwrap();

    let steps: Vec<&str> = reports[0].steps.iter().map(|s| s.task.as_str()).collect();
    assert_eq!(steps, vec!["clean", "copy:build_js", "concat:build_js"]);

    assert!(!root.join("build/stale").exists());
    assert!(root.join("build/src/app/app.js").is_file());
    assert!(!root.join("build/src/app/app.spec.js").exists());
    assert_eq!(
        fs::read_to_string(root.join("bin/app.js")).unwrap(),
        "/* app v0.3.1 */\n(function(){\nvar app;\nvar common;\n})();"
    );
}

#[test]
fn set_override_changes_destination() {
    let temp = project();
    let root = temp.path();
    let options = LoadOptions {
        preset: None,
        set: vec![parse_set("compile_dir=dist").unwrap()],
    };

    let loader = load(root, &options);
    loader.runner().run_all(&["build", "compile"]).unwrap();

    assert!(root.join("dist/app.js").is_file());
    assert!(!root.join("bin").exists());
}

#[test]
fn preset_replaces_build_steps() {
    let temp = project();
    let root = temp.path();
    fs::create_dir_all(root.join("build")).unwrap();
    fs::write(root.join("build/keep.txt"), "kept").unwrap();

    let options = LoadOptions {
        preset: Some("quick".to_string()),
        set: Vec::new(),
    };
    let loader = load(root, &options);
    loader.runner().run("build").unwrap();

    assert!(root.join("build/keep.txt").is_file());
    assert!(root.join("build/src/common.js").is_file());
}

#[test]
fn missing_target_config_is_invalid_config() {
    let temp = project();
    let root = temp.path();
    let pipeline = PIPELINE.replace("targets: [build_js]", "targets: [build_js, build_css]");
    fs::write(root.join("taskwright.yaml"), pipeline).unwrap();

    let loader = load(root, &LoadOptions::default());
    let failure = loader.runner().run("concat").unwrap_err();

    assert_eq!(failure.task, "concat:build_css");
    assert_eq!(failure.chain, vec!["concat"]);
    assert_eq!(failure.code(), ErrorCode::InvalidConfig);
    // The first target ran before the failure.
    assert!(root.join("bin/app.js").is_file());
}

#[test]
fn clean_refuses_paths_outside_project() {
    let temp = project();
    let root = temp.path();
    let pipeline = PIPELINE.replace(
        r#"config: ["<%= build_dir %>", "<%= compile_dir %>"]"#,
        r#"config: ["../elsewhere"]"#,
    );
    fs::write(root.join("taskwright.yaml"), pipeline).unwrap();

    let loader = load(root, &LoadOptions::default());
    let failure = loader.runner().run("clean").unwrap_err();
    assert_eq!(failure.code(), ErrorCode::DelegateFailure);
}

#[test]
fn check_reports_problems_without_running() {
    let temp = project();
    let root = temp.path();
    let pipeline = PIPELINE.replace("compile: [concat]", "compile: [concat, uglify]");
    fs::write(root.join("taskwright.yaml"), pipeline).unwrap();

    let loader = load(root, &LoadOptions::default());
    let issues = loader.check();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].task, "compile");
    assert!(issues[0].message.contains("uglify"));
    assert!(!root.join("bin").exists());
}

#[test]
fn demo_pipeline_loads_cleanly_with_each_preset() {
    let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/taskwright.yaml");

    for preset in [None, Some("dev-deploy"), Some("release")] {
        let options = LoadOptions {
            preset: preset.map(str::to_string),
            set: Vec::new(),
        };
        let loader = ConfigLoader::load(PipelinePaths::with_file(&demo, None), &options).unwrap();
        assert!(loader.check().is_empty(), "{:?}: {:?}", preset, loader.check());
        assert!(loader.registry().contains("concat:compile_js"));
        assert_eq!(loader.watch_bindings().unwrap().len(), 2);
    }
}

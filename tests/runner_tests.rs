//! Integration tests for task execution.
//!
//! These tests drive the runner through a registry and recording delegates,
//! covering fail-fast ordering, cycle handling and config resolution.

use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};
use taskwright::config::{ConfigStore, ConfigValue};
use taskwright::delegates::{DelegateContext, DelegateSet};
use taskwright::error::ErrorCode;
use taskwright::paths::ProjectRoot;
use taskwright::registry::{TaskRegistry, TaskSpec};
use taskwright::runner::TaskRunner;

type Calls = Arc<Mutex<Vec<(String, ConfigValue)>>>;

/// Delegates `ok` (records its call) and `fail` (records, then errors).
fn delegates() -> (DelegateSet, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let mut set = DelegateSet::new();

    let sink = Arc::clone(&calls);
    set.insert("ok", move |config: &ConfigValue, ctx: &DelegateContext| -> anyhow::Result<()> {
        sink.lock().unwrap().push((ctx.task.clone(), config.clone()));
        Ok(())
    });

    let sink = Arc::clone(&calls);
    set.insert("fail", move |config: &ConfigValue, ctx: &DelegateContext| -> anyhow::Result<()> {
        sink.lock().unwrap().push((ctx.task.clone(), config.clone()));
        anyhow::bail!("tool exited with status 1")
    });

    (set, calls)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

fn make_runner(registry: TaskRegistry, store: ConfigStore) -> (TaskRunner, Calls) {
    let (set, calls) = delegates();
    let runner = TaskRunner::new(
        Arc::new(registry),
        Arc::new(set),
        store,
        ProjectRoot::new("."),
    );
    (runner, calls)
}

fn invoked(calls: &Calls) -> Vec<String> {
    calls.lock().unwrap().iter().map(|(task, _)| task.clone()).collect()
}

#[test]
fn failing_step_stops_remaining_steps() {
    let mut registry = TaskRegistry::new();
    registry.register("B", TaskSpec::leaf("fail", json!({}))).unwrap();
    registry.register("C", TaskSpec::leaf("ok", json!({}))).unwrap();
    registry.register("A", TaskSpec::composite(["B", "C"])).unwrap();
    let (runner, calls) = make_runner(registry, ConfigStore::default());

    let failure = runner.run("A").unwrap_err();

    assert_eq!(failure.task, "B");
    assert_eq!(failure.chain, vec!["A"]);
    assert_eq!(failure.code(), ErrorCode::DelegateFailure);
    assert_eq!(invoked(&calls), vec!["B"]);
}

#[test]
fn self_including_composite_is_cyclic_without_invocations() {
    let mut registry = TaskRegistry::new();
    registry.register("lint", TaskSpec::leaf("ok", json!({}))).unwrap();
    registry.register("build", TaskSpec::composite(["lint", "build"])).unwrap();
    let (runner, calls) = make_runner(registry, ConfigStore::default());

    let failure = runner.run("build").unwrap_err();

    assert_eq!(failure.code(), ErrorCode::CyclicTask);
    assert_eq!(failure.task, "build");
    assert!(invoked(&calls).is_empty());
}

#[test]
fn indirect_cycle_reports_path() {
    let mut registry = TaskRegistry::new();
    registry.register("a", TaskSpec::composite(["b"])).unwrap();
    registry.register("b", TaskSpec::composite(["c"])).unwrap();
    registry.register("c", TaskSpec::composite(["a"])).unwrap();
    let (runner, calls) = make_runner(registry, ConfigStore::default());

    let failure = runner.run("a").unwrap_err();

    assert_eq!(failure.code(), ErrorCode::CyclicTask);
    assert!(failure.cause.message.contains("a -> b -> c -> a"));
    assert!(invoked(&calls).is_empty());
}

#[test]
fn unknown_step_fails_before_any_invocation() {
    let mut registry = TaskRegistry::new();
    registry.register("lint", TaskSpec::leaf("ok", json!({}))).unwrap();
    registry.register("build", TaskSpec::composite(["lint", "missing"])).unwrap();
    let (runner, calls) = make_runner(registry, ConfigStore::default());

    let failure = runner.run("build").unwrap_err();

    assert_eq!(failure.code(), ErrorCode::UnknownTask);
    assert_eq!(failure.task, "missing");
    assert_eq!(failure.chain, vec!["build"]);
    assert!(invoked(&calls).is_empty());
}

#[test]
fn unknown_top_level_task() {
    let (runner, _) = make_runner(TaskRegistry::new(), ConfigStore::default());
    let failure = runner.run("deploy").unwrap_err();
    assert_eq!(failure.code(), ErrorCode::UnknownTask);
    assert!(failure.chain.is_empty());
    assert!(failure.to_string().starts_with("Task 'deploy' failed"));
}

#[test]
fn duplicate_registration_rejected() {
    let mut registry = TaskRegistry::new();
    registry.register("build", TaskSpec::composite(["a"])).unwrap();
    let err = registry.register("build", TaskSpec::composite(["b"])).unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateTask);
    assert_eq!(
        registry.resolve_task("build").unwrap(),
        &TaskSpec::composite(["a"])
    );
}

#[test]
fn destination_resolves_against_merged_store() {
    let base = object(json!({ "srcDir": "src", "pkg": { "name": "app" } }));
    let store = ConfigStore::build(base, Map::new());
    let mut registry = TaskRegistry::new();
    registry
        .register(
            "concat",
            TaskSpec::leaf("ok", json!({ "dest": "<%= srcDir %>/<%= pkg.name %>.js" })),
        )
        .unwrap();
    let (runner, calls) = make_runner(registry, store);

    let report = runner.run("concat").unwrap();

    assert_eq!(report.steps.len(), 1);
    assert_eq!(calls.lock().unwrap()[0].1, json!({ "dest": "src/app.js" }));
}

#[test]
fn override_replaces_whole_top_level_value() {
    let base = object(json!({ "dist": { "js": "a.js", "css": "a.css" }, "name": "app" }));
    let overrides = object(json!({ "dist": { "js": "b.js" } }));
    let store = ConfigStore::build(base, overrides);
    let mut registry = TaskRegistry::new();
    registry
        .register(
            "show",
            TaskSpec::leaf("ok", json!(["<%= dist.js %>", "<%= name %>"])),
        )
        .unwrap();
    let (runner, calls) = make_runner(registry, store.clone());

    runner.run("show").unwrap();

    assert_eq!(calls.lock().unwrap()[0].1, json!(["b.js", "app"]));
    assert!(store.lookup("dist.css").is_none());
}

#[test]
fn cyclic_template_fails_the_leaf() {
    let base = object(json!({ "a": "<%= b %>", "b": "<%= a %>" }));
    let mut registry = TaskRegistry::new();
    registry.register("lint", TaskSpec::leaf("ok", json!({ "x": "<%= a %>" }))).unwrap();
    registry.register("build", TaskSpec::composite(["lint"])).unwrap();
    let (runner, calls) = make_runner(registry, ConfigStore::build(base, Map::new()));

    let failure = runner.run("build").unwrap_err();

    assert_eq!(failure.task, "lint");
    assert_eq!(failure.code(), ErrorCode::CyclicTemplate);
    assert!(invoked(&calls).is_empty());
}

#[test]
fn unresolved_reference_fails_the_leaf() {
    let mut registry = TaskRegistry::new();
    registry.register("lint", TaskSpec::leaf("ok", json!("<%= nope.path %>"))).unwrap();
    let (runner, _) = make_runner(registry, ConfigStore::default());

    let failure = runner.run("lint").unwrap_err();
    assert_eq!(failure.code(), ErrorCode::UnresolvedReference);
}

#[test]
fn shared_steps_run_each_time_they_appear() {
    let mut registry = TaskRegistry::new();
    registry.register("clean", TaskSpec::leaf("ok", json!(null))).unwrap();
    registry.register("build", TaskSpec::composite(["clean"])).unwrap();
    registry.register("compile", TaskSpec::composite(["clean"])).unwrap();
    registry.register("deploy", TaskSpec::composite(["build", "compile"])).unwrap();
    let (runner, calls) = make_runner(registry, ConfigStore::default());

    let report = runner.run("deploy").unwrap();

    assert_eq!(report.task, "deploy");
    assert_eq!(invoked(&calls), vec!["clean", "clean"]);
}

#[test]
fn token_free_config_is_passed_through_unchanged() {
    let config = json!({ "files": ["a.js", "b.js"], "level": 3, "strict": true, "banner": null });
    let mut registry = TaskRegistry::new();
    registry.register("lint", TaskSpec::leaf("ok", config.clone())).unwrap();
    let (runner, calls) = make_runner(registry, ConfigStore::default());

    runner.run("lint").unwrap();

    assert_eq!(calls.lock().unwrap()[0].1, config);
}

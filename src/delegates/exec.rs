//! External program delegates.

use super::files::{expand_sources, opt_string, req_string, string_list};
use super::{Delegate, DelegateContext};
use crate::config::ConfigValue;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Runs `{ command, args?, cwd?, env? }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecDelegate;

impl Delegate for ExecDelegate {
    fn invoke(&self, config: &ConfigValue, ctx: &DelegateContext) -> Result<()> {
        let program = req_string(config, "command")?;
        let args = string_list(config.get("args"), "args")?;
        run_program(&program, &args, config, ctx)
    }
}

/// A fixed program registered under a delegate name (a linter, compiler, ...).
///
/// Per task, `args` are appended after the base arguments, followed by the
/// files matched by `src` (relative to `cwd`). A task config that is a plain
/// string or list is read as `src`.
#[derive(Debug, Clone)]
pub struct CommandDelegate {
    program: String,
    base_args: Vec<String>,
}

impl CommandDelegate {
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }
}

impl Delegate for CommandDelegate {
    fn invoke(&self, config: &ConfigValue, ctx: &DelegateContext) -> Result<()> {
        let (extra_args, patterns) = match config {
            Value::Object(map) => (
                string_list(map.get("args"), "args")?,
                string_list(map.get("src"), "src")?,
            ),
            other => (Vec::new(), string_list(Some(other), "src")?),
        };

        let mut args = self.base_args.clone();
        args.extend(extra_args);
        if !patterns.is_empty() {
            let cwd = working_dir(config, ctx)?;
            let files = expand_sources(&cwd, &patterns)?;
            if files.is_empty() {
                bail!("No files matched {}", patterns.join(", "));
            }
            args.extend(files.iter().map(|f| f.to_string_lossy().into_owned()));
        }

        run_program(&self.program, &args, config, ctx)
    }
}

fn working_dir(config: &Value, ctx: &DelegateContext) -> Result<PathBuf> {
    if !config.is_object() {
        return Ok(ctx.root.path().to_path_buf());
    }
    Ok(match opt_string(config, "cwd")? {
        Some(cwd) => ctx.root.resolve(cwd),
        None => ctx.root.path().to_path_buf(),
    })
}

fn run_program(program: &str, args: &[String], config: &Value, ctx: &DelegateContext) -> Result<()> {
    let cwd = working_dir(config, ctx)?;
    let mut command = Command::new(program);
    command.args(args).current_dir(&cwd);

    if let Some(env) = config.get("env") {
        let Value::Object(vars) = env else {
            bail!("'env' must be a mapping, got {}", env);
        };
        for (key, value) in vars {
            command.env(key, crate::template::stringify(value));
        }
    }

    debug!(task = %ctx.task, program, ?args, cwd = %cwd.display(), "Running external program");
    let status = command
        .status()
        .with_context(|| format!("Failed to start '{}'", program))?;

    if !status.success() {
        match status.code() {
            Some(code) => bail!("'{}' exited with status {}", program, code),
            None => bail!("'{}' was terminated by a signal", program),
        }
    }
    Ok(())
}

//! `copy`: copy matched files into a destination directory.

use super::files::{expand_sources, opt_string, req_string, string_list};
use super::{Delegate, DelegateContext};
use crate::config::ConfigValue;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;

/// Copies glob-expanded sources into `dest`, keeping their layout relative
/// to `cwd` (or only the file name with `flatten: true`).
///
/// Config is a single group `{ src, dest, cwd?, flatten? }` or
/// `{ files: [group, ...] }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyDelegate;

impl Delegate for CopyDelegate {
    fn invoke(&self, config: &ConfigValue, ctx: &DelegateContext) -> Result<()> {
        let groups: Vec<&Value> = match config.get("files") {
            Some(Value::Array(groups)) => groups.iter().collect(),
            Some(other) => bail!("'files' must be a list of copy groups, got {}", other),
            None => vec![config],
        };

        let mut copied = 0usize;
        for group in groups {
            copied += copy_group(group, ctx)?;
        }
        debug!(task = %ctx.task, copied, "Copy finished");
        Ok(())
    }
}

fn copy_group(group: &Value, ctx: &DelegateContext) -> Result<usize> {
    let patterns = string_list(group.get("src"), "src")?;
    let dest = ctx.root.sandboxed(req_string(group, "dest")?)?;
    let cwd = match opt_string(group, "cwd")? {
        Some(cwd) => ctx.root.resolve(cwd),
        None => ctx.root.path().to_path_buf(),
    };
    let flatten = group.get("flatten").and_then(Value::as_bool).unwrap_or(false);

    let sources = expand_sources(&cwd, &patterns)?;
    for rel in &sources {
        let target = if flatten {
            match rel.file_name() {
                Some(name) => dest.join(name),
                None => continue,
            }
        } else {
            dest.join(rel)
        };
        let target = ctx.root.sandboxed(&target)?;
        if !target.starts_with(&dest) {
            bail!(
                "Source {} would be copied outside {}",
                rel.display(),
                dest.display()
            );
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::copy(cwd.join(rel), &target)
            .with_context(|| format!("Failed to copy {} to {}", rel.display(), target.display()))?;
    }
    Ok(sources.len())
}

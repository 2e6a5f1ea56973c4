//! `clean`: delete files and directories.

use super::files::string_list;
use super::{Delegate, DelegateContext};
use crate::config::ConfigValue;
use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

/// Removes each listed path. Missing paths are ignored.
///
/// Config is a path, a list of paths, or `{ paths: [...] }`. Paths outside
/// the project root are refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanDelegate;

impl Delegate for CleanDelegate {
    fn invoke(&self, config: &ConfigValue, ctx: &DelegateContext) -> Result<()> {
        let targets = match config {
            Value::Object(map) => string_list(map.get("paths"), "paths")?,
            other => string_list(Some(other), "clean")?,
        };

        for target in targets {
            let path = ctx.root.sandboxed(&target)?;
            if path.is_dir() {
                std::fs::remove_dir_all(&path)
                    .with_context(|| format!("Failed to remove directory {}", path.display()))?;
                debug!(task = %ctx.task, path = %path.display(), "Removed directory");
            } else if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove file {}", path.display()))?;
                debug!(task = %ctx.task, path = %path.display(), "Removed file");
            }
        }
        Ok(())
    }
}

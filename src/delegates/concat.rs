//! `concat`: join files into one, with an optional banner.

use super::files::{expand_sources, req_string, string_list};
use super::{Delegate, DelegateContext};
use crate::config::ConfigValue;
use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

const DEFAULT_SEPARATOR: &str = "\n";

/// Concatenates `src` into `dest`.
///
/// Config: `{ src, dest, options: { banner?, separator? } }`. Sources are
/// read before `dest` is written, so `dest` may also be a source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatDelegate;

impl Delegate for ConcatDelegate {
    fn invoke(&self, config: &ConfigValue, ctx: &DelegateContext) -> Result<()> {
        let patterns = string_list(config.get("src"), "src")?;
        let dest = ctx.root.sandboxed(req_string(config, "dest")?)?;
        let options = config.get("options");
        let banner = options
            .and_then(|o| o.get("banner"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let separator = options
            .and_then(|o| o.get("separator"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SEPARATOR);

        let sources = expand_sources(ctx.root.path(), &patterns)?;
        if sources.is_empty() {
            warn!(task = %ctx.task, dest = %dest.display(), "No source files matched");
        }

        let mut parts = Vec::with_capacity(sources.len());
        for rel in &sources {
            let path = ctx.root.resolve(rel);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parts.push(content);
        }

        let mut output = String::from(banner);
        output.push_str(&parts.join(separator));

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::write(&dest, output)
            .with_context(|| format!("Failed to write {}", dest.display()))?;

        debug!(task = %ctx.task, files = sources.len(), dest = %dest.display(), "Concatenated");
        Ok(())
    }
}

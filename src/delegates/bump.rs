//! `bump`: increment the `version` field of JSON manifests.

use super::files::{opt_string, string_list};
use super::{Delegate, DelegateContext};
use crate::config::ConfigValue;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::info;

/// Bumps `major`, `minor` or `patch` (default) in each manifest of `files`
/// (default `package.json`). Key order and other fields are preserved;
/// pre-release and build suffixes are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct BumpDelegate;

/// Semver component to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpPart {
    Major,
    Minor,
    Patch,
}

impl BumpPart {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "major" => Some(BumpPart::Major),
            "minor" => Some(BumpPart::Minor),
            "patch" => Some(BumpPart::Patch),
            _ => None,
        }
    }
}

/// Compute the next version string.
pub fn bump_version(version: &str, part: BumpPart) -> Result<String> {
    let core = version
        .split(['-', '+'])
        .next()
        .unwrap_or(version);
    let numbers: Vec<u64> = core
        .split('.')
        .map(|n| n.parse::<u64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid version: {}", version))?;
    let [major, minor, patch] = numbers[..] else {
        bail!("Version must have three components: {}", version);
    };

    let increment = |n: u64| {
        n.checked_add(1)
            .with_context(|| format!("Version component overflows: {}", version))
    };
    Ok(match part {
        BumpPart::Major => format!("{}.0.0", increment(major)?),
        BumpPart::Minor => format!("{}.{}.0", major, increment(minor)?),
        BumpPart::Patch => format!("{}.{}.{}", major, minor, increment(patch)?),
    })
}

impl Delegate for BumpDelegate {
    fn invoke(&self, config: &ConfigValue, ctx: &DelegateContext) -> Result<()> {
        let mut files = string_list(config.get("files"), "files")?;
        if files.is_empty() {
            files.push("package.json".to_string());
        }
        let part = match opt_string(config, "part")? {
            Some(part) => BumpPart::from_str(&part)
                .with_context(|| format!("Unknown bump part '{}' (use major, minor or patch)", part))?,
            None => BumpPart::Patch,
        };

        for file in files {
            let path = ctx.root.sandboxed(&file)?;
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let mut manifest: Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;

            let current = manifest
                .get("version")
                .and_then(Value::as_str)
                .with_context(|| format!("{} has no string 'version' field", file))?;
            let next = bump_version(current, part)?;
            info!(task = %ctx.task, file = %file, from = %current, to = %next, "Bumped version");
            manifest["version"] = Value::String(next);

            let mut out = serde_json::to_string_pretty(&manifest)?;
            out.push('\n');
            std::fs::write(&path, out)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(())
    }
}

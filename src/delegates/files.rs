//! Source list expansion shared by the file delegates.
//!
//! A source list is a string or a list of strings. Each entry is a glob
//! pattern or a literal path relative to a working directory. Entries are
//! processed in order; a `!`-prefixed entry removes earlier matches.

use anyhow::{Context, Result, bail};
use glob::{MatchOptions, Pattern};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Read an optional string-or-list field.
pub fn string_list(value: Option<&Value>, field: &str) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => bail!("'{}' entries must be strings, got {}", field, other),
            })
            .collect(),
        Some(other) => bail!("'{}' must be a string or list of strings, got {}", field, other),
    }
}

/// Read an optional string field.
pub fn opt_string(config: &Value, field: &str) -> Result<Option<String>> {
    match config.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => bail!("'{}' must be a string, got {}", field, other),
    }
}

/// Read a required string field.
pub fn req_string(config: &Value, field: &str) -> Result<String> {
    opt_string(config, field)?.with_context(|| format!("'{}' is required", field))
}

fn has_glob_chars(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Expand `patterns` relative to `cwd` into existing files.
///
/// Returned paths are relative to `cwd`, deduplicated, in first-match order.
/// Glob results within one pattern come back sorted. Literal paths that do
/// not exist are skipped with a warning.
pub fn expand_sources(cwd: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    let escaped_cwd = Pattern::escape(&cwd.to_string_lossy());

    for pattern in patterns {
        if let Some(exclude) = pattern.strip_prefix('!') {
            let exclude = Pattern::new(exclude)
                .with_context(|| format!("Invalid exclude pattern: {}", exclude))?;
            files.retain(|f| !exclude.matches_path_with(f, match_options()));
            continue;
        }

        if !has_glob_chars(pattern) {
            let rel = PathBuf::from(pattern);
            if cwd.join(&rel).is_file() {
                push_unique(&mut files, rel);
            } else {
                warn!(path = %pattern, "Source file not found, skipping");
            }
            continue;
        }

        let full = format!("{}/{}", escaped_cwd.trim_end_matches('/'), pattern);
        let entries = glob::glob_with(&full, match_options())
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        let mut matched = Vec::new();
        for entry in entries {
            let path = entry.context("Failed to read glob entry")?;
            if !path.is_file() {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(cwd) {
                matched.push(rel.to_path_buf());
            }
        }
        matched.sort();
        for rel in matched {
            push_unique(&mut files, rel);
        }
    }

    Ok(files)
}

fn push_unique(files: &mut Vec<PathBuf>, path: PathBuf) {
    if !files.contains(&path) {
        files.push(path);
    }
}

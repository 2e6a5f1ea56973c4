//! Template token expansion for configuration values.
//!
//! Strings may embed `<%= expr %>` tokens where `expr` is either a dotted
//! path into the [`ConfigStore`] (`pkg.name`, `files.0.dest`) or the date
//! helper `today("yyyy-mm-dd")`. Substituted text may itself contain tokens;
//! expansion repeats until none remain or [`MAX_TEMPLATE_DEPTH`] passes have
//! been made.

use crate::config::{ConfigStore, ConfigValue};
use crate::error::{PipelineError, PipelineResult};
use regex_lite::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Maximum number of substitution passes before a template counts as cyclic.
pub const MAX_TEMPLATE_DEPTH: usize = 10;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<%=\s*(.*?)\s*%>").expect("token pattern is valid"));

static TODAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^today\(\s*(?:"([^"]*)"|'([^']*)')?\s*\)$"#).expect("today pattern is valid")
});

/// Resolve every template token in `value` against `store`.
///
/// Lists and mappings are resolved element-wise; non-string scalars are
/// returned unchanged.
pub fn resolve(value: &ConfigValue, store: &ConfigStore) -> PipelineResult<ConfigValue> {
    match value {
        Value::String(s) => resolve_str(s, store).map(Value::String),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve(item, store))
            .collect::<PipelineResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), resolve(item, store)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Resolve all tokens in a single string.
pub fn resolve_str(template: &str, store: &ConfigStore) -> PipelineResult<String> {
    let mut current = template.to_string();
    for _ in 0..MAX_TEMPLATE_DEPTH {
        if !TOKEN.is_match(&current) {
            return Ok(current);
        }
        current = expand_once(&current, store)?;
    }

    if TOKEN.is_match(&current) {
        Err(PipelineError::cyclic_template(template, MAX_TEMPLATE_DEPTH))
    } else {
        Ok(current)
    }
}

/// Whether a value contains any template token.
pub fn has_tokens(value: &ConfigValue) -> bool {
    match value {
        Value::String(s) => TOKEN.is_match(s),
        Value::Array(items) => items.iter().any(has_tokens),
        Value::Object(map) => map.values().any(has_tokens),
        _ => false,
    }
}

/// Dotted paths referenced directly by `value` (helpers excluded).
pub fn references(value: &ConfigValue) -> Vec<String> {
    let mut refs = Vec::new();
    collect_references(value, &mut refs);
    refs
}

fn collect_references(value: &ConfigValue, refs: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for caps in TOKEN.captures_iter(s) {
                let expr = caps.get(1).map_or("", |m| m.as_str());
                if !TODAY.is_match(expr) && !refs.iter().any(|r| r == expr) {
                    refs.push(expr.to_string());
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_references(item, refs)),
        Value::Object(map) => map.values().for_each(|item| collect_references(item, refs)),
        _ => {}
    }
}

/// String representation used when a value is substituted into a string.
///
/// Lists join their elements with `,`; mappings render as compact JSON.
pub fn stringify(value: &ConfigValue) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Perform one substitution pass over `s`.
fn expand_once(s: &str, store: &ConfigStore) -> PipelineResult<String> {
    let mut out = String::with_capacity(s.len());
    let mut last = 0;

    for caps in TOKEN.captures_iter(s) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let expr = caps.get(1).map_or("", |m| m.as_str());

        out.push_str(&s[last..whole.start()]);
        out.push_str(&evaluate(expr, store)?);
        last = whole.end();
    }

    out.push_str(&s[last..]);
    Ok(out)
}

fn evaluate(expr: &str, store: &ConfigStore) -> PipelineResult<String> {
    if let Some(caps) = TODAY.captures(expr) {
        let format = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("yyyy-mm-dd", |m| m.as_str());
        return Ok(format_date(store, format));
    }

    if expr.is_empty() {
        return Err(PipelineError::unresolved_reference(expr));
    }

    store
        .lookup(expr)
        .map(stringify)
        .ok_or_else(|| PipelineError::unresolved_reference(expr))
}

/// Format the store's run date using `yyyy`, `yy`, `mm`, `dd` placeholders.
fn format_date(store: &ConfigStore, format: &str) -> String {
    let mut pattern = format.replace('%', "%%");
    for (token, spec) in [("yyyy", "%Y"), ("yy", "%y"), ("mm", "%m"), ("dd", "%d")] {
        pattern = pattern.replace(token, spec);
    }
    store.today().format(&pattern).to_string()
}

//! Immutable configuration store shared by every task in a run.

use super::merge::shallow_merge;
use crate::error::{PipelineError, PipelineResult};
use chrono::{Local, NaiveDate};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Configuration value type. Strings may contain `<%= dotted.path %>` tokens.
pub type ConfigValue = Value;

/// Read-only mapping from key to [`ConfigValue`], built once per run.
///
/// Cloning is cheap; all clones share the same underlying mapping.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    values: Arc<Map<String, Value>>,
    /// Date used by the `today(...)` template helper.
    today: NaiveDate,
}

impl ConfigStore {
    /// Build a store by shallow-merging `overrides` over `base`.
    ///
    /// Missing keys are not reported here; see [`ConfigStore::require`].
    pub fn build(base: Map<String, Value>, overrides: Map<String, Value>) -> Self {
        Self::build_on(base, overrides, Local::now().date_naive())
    }

    /// Build a store with an explicit run date.
    pub fn build_on(base: Map<String, Value>, overrides: Map<String, Value>, today: NaiveDate) -> Self {
        Self {
            values: Arc::new(shallow_merge(base, overrides)),
            today,
        }
    }

    /// Build a store from a JSON object value. Non-object values yield an empty store.
    pub fn from_value(value: Value) -> Self {
        let base = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::build(base, Map::new())
    }

    /// Look up a dotted path such as `pkg.name` or `files.0.dest`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.values.get(first)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Look up a dotted path, failing with `InvalidConfig` if it is absent.
    pub fn require(&self, path: &str) -> PipelineResult<&Value> {
        self.lookup(path)
            .ok_or_else(|| PipelineError::missing_key(path))
    }

    /// The run date used by `today(...)`.
    pub fn today(&self) -> NaiveDate {
        self.today
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::build(Map::new(), Map::new())
    }
}

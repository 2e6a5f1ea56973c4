//! Shallow merge for configuration tiers.
//!
//! Top-level keys of a higher tier replace the same key of a lower tier in
//! full. Nested mappings are not merged key-by-key.

use serde_json::{Map, Value};

/// Shallow merge two mappings, with `overlay` taking precedence over `base`.
///
/// Keys only in `base` are kept in their original position; keys in
/// `overlay` replace the base value entirely or are appended.
///
/// # Example
/// ```
/// use serde_json::json;
/// use taskwright::config::shallow_merge;
///
/// let base = json!({ "pkg": { "name": "app", "version": "1.0.0" }, "build_dir": "build" });
/// let overlay = json!({ "pkg": { "name": "lib" } });
/// let merged = shallow_merge(base.as_object().unwrap().clone(), overlay.as_object().unwrap().clone());
/// assert_eq!(merged["pkg"], json!({ "name": "lib" }));
/// assert_eq!(merged["build_dir"], json!("build"));
/// ```
pub fn shallow_merge(mut base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in overlay {
        base.insert(key, value);
    }
    base
}

/// Merge multiple tiers in order, with later tiers taking precedence.
pub fn merge_all(tiers: impl IntoIterator<Item = Map<String, Value>>) -> Map<String, Value> {
    tiers.into_iter().fold(Map::new(), shallow_merge)
}

//! Output formatting for task listings and run summaries.

use crate::registry::{CheckIssue, TaskConfig, TaskEntry, TaskRegistry, TaskSpec};
use crate::runner::RunReport;
use serde_json::{Value, json};

/// Output format for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::from_str(s).ok_or_else(|| format!("Unknown format: {} (use text or json)", s))
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// One-line summary of what a task does.
fn task_summary(entry: &TaskEntry) -> String {
    if let Some(ref description) = entry.description {
        return description.clone();
    }
    match &entry.spec {
        TaskSpec::Composite(composite) if composite.steps.is_empty() => "(no steps)".to_string(),
        TaskSpec::Composite(composite) => composite.steps.join(" -> "),
        TaskSpec::Leaf(leaf) => match &leaf.config {
            TaskConfig::Key(key) => format!("[{}] config at '{}'", leaf.delegate, key),
            TaskConfig::Inline(_) => format!("[{}]", leaf.delegate),
        },
    }
}

/// Tasks as aligned text, one per line, in registration order.
pub fn format_tasks_text(registry: &TaskRegistry) -> String {
    let width = registry
        .entries()
        .iter()
        .map(|e| e.name.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for entry in registry.entries() {
        out.push_str(&format!(
            "{:width$}  {}\n",
            entry.name,
            task_summary(entry),
            width = width
        ));
    }
    out
}

/// Tasks as a JSON array.
pub fn tasks_json(registry: &TaskRegistry) -> Value {
    serde_json::to_value(registry.entries()).unwrap_or_else(|_| json!([]))
}

/// Problems found by `check`, one per line.
pub fn format_issues_text(issues: &[CheckIssue]) -> String {
    let mut out = String::new();
    for issue in issues {
        out.push_str(&format!("{}: {}\n", issue.task, issue.message));
    }
    out
}

/// Summary printed after a successful `run`.
pub fn format_run_summary(reports: &[RunReport]) -> String {
    let mut out = String::new();
    for report in reports {
        out.push_str(&format!(
            "{} done: {} step(s) in {} ms\n",
            report.task,
            report.steps.len(),
            report.duration.as_millis()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        registry
            .register("clean", TaskSpec::leaf("clean", json!(["build"])))
            .unwrap();
        registry
            .register("concat:js", TaskSpec::leaf_from_key("concat", "concat.js"))
            .unwrap();
        registry
            .register_described(
                "build",
                TaskSpec::composite(["clean", "concat:js"]),
                Some("Build everything".to_string()),
            )
            .unwrap();
        registry
            .register("default", TaskSpec::composite(["build"]))
            .unwrap();
        registry
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("text"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::from_str("xml"), None);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_tasks_text() {
        let text = format_tasks_text(&registry());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "clean      [clean]");
        assert_eq!(lines[1], "concat:js  [concat] config at 'concat.js'");
        assert_eq!(lines[2], "build      Build everything");
        assert_eq!(lines[3], "default    build");
    }

    #[test]
    fn test_tasks_json() {
        let value = tasks_json(&registry());
        assert_eq!(value[0]["name"], "clean");
        assert_eq!(value[0]["spec"]["kind"], "leaf");
        assert_eq!(value[2]["spec"]["steps"], json!(["clean", "concat:js"]));
        assert_eq!(value[2]["description"], "Build everything");
        assert!(value[3].get("description").is_none());
    }
}

//! Structured error types for pipeline resolution and execution.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Template errors
    UnresolvedReference,
    CyclicTemplate,

    // Configuration errors
    InvalidConfig,

    // Registry errors
    DuplicateTask,
    UnknownTask,
    CyclicTask,

    // Execution errors
    DelegateFailure,
}

/// Structured error raised while resolving or running a pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineError {
    pub code: ErrorCode,
    pub message: String,
    /// Dotted config path or task name the error refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl PipelineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    // Convenience constructors

    pub fn unresolved_reference(path: &str) -> Self {
        Self::new(
            ErrorCode::UnresolvedReference,
            format!("Unresolved template reference: {}", path),
        )
        .with_path(path)
    }

    pub fn cyclic_template(template: &str, depth: usize) -> Self {
        Self::new(
            ErrorCode::CyclicTemplate,
            format!(
                "Template still unresolved after {} expansion passes (cyclic or too deep): {}",
                depth, template
            ),
        )
    }

    pub fn invalid_config(path: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidConfig, reason).with_path(path)
    }

    pub fn missing_key(path: &str) -> Self {
        Self::invalid_config(path, &format!("Required config key is missing: {}", path))
    }

    pub fn duplicate_task(name: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateTask,
            format!("Task already registered: {}", name),
        )
        .with_path(name)
    }

    pub fn unknown_task(name: &str) -> Self {
        Self::new(ErrorCode::UnknownTask, format!("Task not found: {}", name)).with_path(name)
    }

    pub fn cyclic_task(chain: &[String], name: &str) -> Self {
        Self::new(
            ErrorCode::CyclicTask,
            format!("Task cycle detected: {} -> {}", chain.join(" -> "), name),
        )
        .with_path(name)
    }

    pub fn delegate_failure(delegate: &str, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::DelegateFailure,
            format!("Delegate '{}' failed: {}", delegate, err),
        )
        .with_path(delegate)
    }

    pub fn unknown_delegate(delegate: &str) -> Self {
        Self::new(
            ErrorCode::InvalidConfig,
            format!("No delegate registered under name: {}", delegate),
        )
        .with_path(delegate)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PipelineError {}

/// Result type for resolution and registry operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// A run failure, attributed to the task that caused it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Task '{task}' failed: {cause}")]
pub struct TaskFailure {
    /// Name of the task that failed.
    pub task: String,
    /// Composite tasks leading from the top-level invocation to `task`.
    pub chain: Vec<String>,
    #[source]
    pub cause: PipelineError,
}

impl TaskFailure {
    pub fn new(task: impl Into<String>, chain: Vec<String>, cause: PipelineError) -> Self {
        Self {
            task: task.into(),
            chain,
            cause,
        }
    }

    /// The underlying error code.
    pub fn code(&self) -> ErrorCode {
        self.cause.code
    }
}

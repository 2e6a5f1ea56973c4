//! Completion notifications for watch bindings.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

/// Receives a notification after a notifying binding completes successfully.
pub trait Notifier: Send + Sync {
    fn notify(&self, binding: &str, changed: &[String]);
}

/// Emits a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, binding: &str, changed: &[String]) {
        info!(binding = %binding, changed = ?changed, "Reload notification");
    }
}

/// Rewrites a trigger file so a live-reload server watching it refreshes.
///
/// The file receives the RFC 3339 timestamp and the changed paths.
#[derive(Debug, Clone)]
pub struct TouchNotifier {
    path: PathBuf,
}

impl TouchNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn touch(&self, changed: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut content = chrono::Local::now().to_rfc3339();
        for path in changed {
            content.push('\n');
            content.push_str(path);
        }
        content.push('\n');
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

impl Notifier for TouchNotifier {
    fn notify(&self, binding: &str, changed: &[String]) {
        match self.touch(changed) {
            Ok(()) => info!(binding = %binding, file = %self.path.display(), "Live-reload file touched"),
            Err(e) => warn!(binding = %binding, error = %format!("{:#}", e), "Live-reload notification failed"),
        }
    }
}

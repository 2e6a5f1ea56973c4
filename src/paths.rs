//! Project root handling and sandboxing.
//!
//! Delegates receive paths relative to the project root (the directory of the
//! pipeline file). Destructive operations go through [`ProjectRoot::sandboxed`],
//! which rejects anything that would escape the root.

use anyhow::{Result, bail};
use std::path::{Component, Path, PathBuf};

/// Absolute, normalized project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    root: PathBuf,
}

impl ProjectRoot {
    /// Create a root from a path, made absolute against the current directory.
    ///
    /// Canonicalizes when the directory exists so that paths reported by the
    /// file watcher compare equal.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        if let Ok(canonical) = std::fs::canonicalize(root) {
            return Self { root: canonical };
        }
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(root)
        };
        Self {
            root: normalize_path_components(&absolute),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Join a relative path onto the root. Absolute paths are returned as-is.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            normalize_path_components(path)
        } else {
            normalize_path_components(&self.root.join(path))
        }
    }

    /// Like [`resolve`](Self::resolve), but fails if the result is the root
    /// itself or lies outside it.
    pub fn sandboxed(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let resolved = self.resolve(path.as_ref());
        if resolved == self.root {
            bail!("Refusing to operate on the project root itself");
        }
        if !resolved.starts_with(&self.root) {
            bail!(
                "Path escapes project root: {} (root: {})",
                path_to_forward_slashes(&resolved),
                path_to_forward_slashes(&self.root)
            );
        }
        Ok(resolved)
    }

    /// Path relative to the root with forward slashes, if inside the root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let normalized = normalize_path_components(path);
        if let Ok(rel) = normalized.strip_prefix(&self.root) {
            return Some(path_to_forward_slashes(rel));
        }
        let canonical = std::fs::canonicalize(path).ok()?;
        canonical
            .strip_prefix(&self.root)
            .ok()
            .map(path_to_forward_slashes)
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize_path_components(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => components.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                } else if components.is_empty() {
                    components.push(Component::ParentDir);
                }
                // `..` above the filesystem root stays at the root.
            }
            Component::Normal(_) => components.push(component),
        }
    }

    components.iter().collect()
}

pub fn path_to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

//! Path validation - filesystem sandboxing to the workspace directory.
//!
//! A candidate is joined onto the root and its `.` and `..` segments are
//! folded. The longest prefix that exists on disk is then canonicalized, so
//! symlinks are followed, and the part that does not exist yet is rejoined.
//! Both the folded path and the real path must sit under the root.

use std::path::{Component, Path, PathBuf};

use toolloop_core::ToolError;

/// Error returned when path validation fails.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path '{path}' escapes workspace directory")]
    EscapesWorkspace { path: String },

    #[error("Invalid workspace root '{path}': {reason}")]
    InvalidRoot { path: String, reason: String },
}

impl From<PathValidationError> for ToolError {
    fn from(err: PathValidationError) -> Self {
        ToolError::SandboxViolation(err.to_string())
    }
}

/// A fixed root directory that all tool paths must resolve within.
#[derive(Debug, Clone)]
pub struct WorkspaceSandbox {
    root: PathBuf,
}

impl WorkspaceSandbox {
    /// Open a sandbox at `root`, creating the directory if needed.
    ///
    /// The root is canonicalized once here so later checks compare against
    /// a symlink-free absolute path.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PathValidationError> {
        let root = root.as_ref();
        let invalid = |reason: String| PathValidationError::InvalidRoot {
            path: root.display().to_string(),
            reason,
        };

        std::fs::create_dir_all(root).map_err(|e| invalid(e.to_string()))?;
        let root = root.canonicalize().map_err(|e| invalid(e.to_string()))?;
        if !root.is_dir() {
            return Err(invalid("not a directory".into()));
        }

        tracing::debug!(root = %root.display(), "Workspace sandbox ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path to an absolute path inside the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathValidationError> {
        let resolved = normalize(&self.root.join(path));

        if !self.is_inside(&resolved) {
            tracing::warn!(path, "Rejected path outside workspace");
            return Err(PathValidationError::EscapesWorkspace { path: path.into() });
        }

        Ok(resolved)
    }

    /// Whether `path` stays under the root, both as written and once
    /// symlinks along it are followed.
    pub fn is_inside(&self, path: &Path) -> bool {
        if !path.starts_with(&self.root) {
            return false;
        }
        real_path(path).is_some_and(|real| real.starts_with(&self.root))
    }

    /// The root-relative form of a path previously produced by `resolve`.
    pub fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok()
    }
}

/// Canonicalize the longest existing prefix of `path` and rejoin the rest.
///
/// `None` when a component exists but cannot be resolved, such as a
/// dangling symlink.
fn real_path(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(mut real) => {
                real.extend(missing.iter().rev());
                return Some(real);
            }
            Err(_) if existing.symlink_metadata().is_ok() => return None,
            Err(_) => {
                missing.push(existing.file_name()?.to_os_string());
                existing = existing.parent()?;
            }
        }
    }
}

/// Fold `.` and `..` without consulting the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
        }
    }
    out
}

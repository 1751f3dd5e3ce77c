//! Repository context resolution for agentlock.
//!
//! Finds the repository root the agents share, resolves the lease and
//! activity directories beneath it, and turns whatever path a host runtime
//! hands us (absolute, `./`-prefixed, containing `..`) into the canonical
//! repo-relative key that leases are stored under.

use crate::config::{CONFIG_FILE_NAME, Config};
use crate::error::{AgentLockError, Result};
use crate::git;
use std::env;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Resolved paths for one repository.
///
/// All paths are absolute.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    /// Absolute path to the shared working tree.
    pub root: PathBuf,

    /// `root` with symlinks resolved, when it exists on disk.
    canonical_root: Option<PathBuf>,

    /// Absolute path to the lease directory (default: `{root}/.agent-locks/`).
    pub lock_dir: PathBuf,

    /// Absolute path to the activity ledger directory (default: `{root}/.agent-activity/`).
    pub activity_dir: PathBuf,
}

impl WorkspaceContext {
    /// Build a context for an already-known root.
    pub fn new<P: AsRef<Path>>(root: P, config: &Config) -> Self {
        let root = root.as_ref().to_path_buf();
        let canonical_root = root.canonicalize().ok();
        let lock_dir = root.join(&config.lock_directory);
        let activity_dir = root.join(&config.activity_directory);

        Self {
            root,
            canonical_root,
            lock_dir,
            activity_dir,
        }
    }

    /// Resolve the repository root.
    ///
    /// Precedence: explicit override, then `git rev-parse --show-toplevel` from
    /// the current directory, then the current directory itself.
    pub fn resolve_root(root_override: Option<&Path>) -> Result<PathBuf> {
        let cwd = env::current_dir().map_err(|e| {
            AgentLockError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        if let Some(root) = root_override {
            return Ok(if root.is_absolute() {
                root.to_path_buf()
            } else {
                cwd.join(root)
            });
        }

        match git::get_repo_root(&cwd) {
            Ok(root) => Ok(root),
            Err(e) => {
                debug!(error = %e, cwd = %cwd.display(), "no git repository; using cwd as root");
                Ok(cwd)
            }
        }
    }

    /// Default config file location for a root.
    pub fn default_config_path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// Canonical repo-relative form of `raw`, with `/` separators.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - e.g. `src/main.rs`
    /// * `Err(AgentLockError::UserError)` - Empty path, the root itself, or a
    ///   path outside the repository
    pub fn relative_path(&self, raw: &str) -> Result<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AgentLockError::UserError("empty target path".to_string()));
        }

        let raw = raw.replace('\\', "/");
        let path = Path::new(&raw);
        let relative = if path.is_absolute() {
            self.strip_root(path).ok_or_else(|| {
                AgentLockError::UserError(format!(
                    "path '{}' is outside the repository at '{}'",
                    raw,
                    self.root.display()
                ))
            })?
        } else {
            path.to_path_buf()
        };

        let parts = normalize_components(&relative).ok_or_else(|| {
            AgentLockError::UserError(format!("path '{}' escapes the repository root", raw))
        })?;

        if parts.is_empty() {
            return Err(AgentLockError::UserError(format!(
                "path '{}' refers to the repository root, not a file",
                raw
            )));
        }

        Ok(parts.join("/"))
    }

    fn strip_root(&self, path: &Path) -> Option<PathBuf> {
        if let Ok(rest) = path.strip_prefix(&self.root) {
            return Some(rest.to_path_buf());
        }

        let canonical_root = self.canonical_root.as_ref()?;
        if let Ok(rest) = path.strip_prefix(canonical_root) {
            return Some(rest.to_path_buf());
        }

        // The target may not exist yet (Write creates files), so resolve the
        // deepest existing ancestor and re-append the remainder.
        let resolved = canonicalize_lenient(path)?;
        resolved
            .strip_prefix(canonical_root)
            .ok()
            .map(Path::to_path_buf)
    }
}

/// Lexically normalize `.` and `..`; `None` if the path climbs above its start
/// or carries a root/prefix component.
fn normalize_components(path: &Path) -> Option<Vec<String>> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts)
}

fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut rest: Vec<&std::ffi::OsStr> = Vec::new();

    while !existing.exists() {
        rest.push(existing.file_name()?);
        existing = existing.parent()?;
    }

    let mut resolved = existing.canonicalize().ok()?;
    for part in rest.iter().rev() {
        resolved.push(part);
    }
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx(temp_dir: &TempDir) -> WorkspaceContext {
        WorkspaceContext::new(temp_dir.path(), &Config::default())
    }

    #[test]
    fn test_dirs_follow_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.lock_directory = "locks".to_string();
        config.activity_directory = "activity".to_string();

        let ctx = WorkspaceContext::new(temp_dir.path(), &config);
        assert_eq!(ctx.lock_dir, temp_dir.path().join("locks"));
        assert_eq!(ctx.activity_dir, temp_dir.path().join("activity"));
    }

    #[test]
    fn test_relative_path_passthrough() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ctx(&temp_dir);

        assert_eq!(ctx.relative_path("src/main.go").unwrap(), "src/main.go");
        assert_eq!(ctx.relative_path("./src/main.go").unwrap(), "src/main.go");
        assert_eq!(ctx.relative_path("src/./a/../main.go").unwrap(), "src/main.go");
        assert_eq!(ctx.relative_path("src\\win\\file.rs").unwrap(), "src/win/file.rs");
    }

    #[test]
    fn test_relative_path_from_absolute() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ctx(&temp_dir);

        let abs = temp_dir.path().join("src").join("lib.rs");
        assert_eq!(ctx.relative_path(abs.to_str().unwrap()).unwrap(), "src/lib.rs");
    }

    #[test]
    fn test_relative_path_from_canonical_absolute_of_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ctx(&temp_dir);
        std::fs::create_dir_all(temp_dir.path().join("src")).unwrap();

        let canonical = temp_dir.path().canonicalize().unwrap();
        let abs = canonical.join("src").join("not_yet_written.rs");
        assert_eq!(
            ctx.relative_path(abs.to_str().unwrap()).unwrap(),
            "src/not_yet_written.rs"
        );
    }

    #[test]
    fn test_relative_path_rejects_outside_paths() {
        let temp_dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let ctx = ctx(&temp_dir);

        let outside = other.path().join("file.rs");
        let err = ctx.relative_path(outside.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("outside the repository"));

        let err = ctx.relative_path("../escape.rs").unwrap_err();
        assert!(err.to_string().contains("escapes"));
    }

    #[test]
    fn test_relative_path_rejects_root_and_empty() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ctx(&temp_dir);

        assert!(ctx.relative_path("").is_err());
        assert!(ctx.relative_path(".").is_err());
        assert!(ctx.relative_path(temp_dir.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_resolve_root_override() {
        let temp_dir = TempDir::new().unwrap();
        let root = WorkspaceContext::resolve_root(Some(temp_dir.path())).unwrap();
        assert_eq!(root, temp_dir.path());
    }

    #[test]
    fn test_default_config_path() {
        let root = Path::new("/repo");
        assert_eq!(
            WorkspaceContext::default_config_path(root),
            PathBuf::from("/repo/.agentlock.yaml")
        );
    }
}

//! Git command runner for agentlock.
//!
//! Only repository-root discovery goes through git; leases and the activity
//! ledger are plain files and never touch the index.

use crate::error::{AgentLockError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

/// Run a git command with the specified working directory.
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(AgentLockError::GitError)` - When git is missing or exits non-zero
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(args)
        .output()
        .map_err(|e| {
            AgentLockError::GitError(format!("failed to execute git: {} (is git installed?)", e))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let exit_code = output.status.code().unwrap_or(-1);
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout.clone()
        } else {
            git_output.stderr.clone()
        };

        Err(AgentLockError::GitError(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            exit_code,
            error_msg
        )))
    }
}

/// Get the repository root directory using `git rev-parse --show-toplevel`.
pub fn get_repo_root<P: AsRef<Path>>(cwd: P) -> Result<PathBuf> {
    let output = run_git(cwd, &["rev-parse", "--show-toplevel"])?;
    if output.stdout.is_empty() {
        return Err(AgentLockError::GitError(
            "git rev-parse --show-toplevel returned an empty path".to_string(),
        ));
    }
    Ok(PathBuf::from(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_repo_root_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path();

        Command::new("git")
            .current_dir(path)
            .args(["init"])
            .output()
            .expect("failed to init git repo");

        let nested = path.join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let root = get_repo_root(&nested).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            path.canonicalize().unwrap()
        );
    }

    #[test]
    fn test_run_git_failure_is_git_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = run_git(temp_dir.path(), &["definitely-not-a-subcommand"]).unwrap_err();
        assert!(matches!(err, AgentLockError::GitError(_)));
        assert!(err.to_string().contains("definitely-not-a-subcommand"));
    }
}

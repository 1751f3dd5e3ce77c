//! Exclusion filter deciding which paths take part in locking.
//!
//! Patterns are compiled once into `GlobSet`s with `literal_separator(true)`,
//! so `*` matches within a single path segment and `**` crosses segments.
//!
//! # Matching rule
//!
//! - A pattern containing `/` is matched against the full repo-relative path
//!   (`.git/**` excludes `.git/config` but not `src/.git/config`).
//! - A pattern without `/` is matched against the basename as well as the full
//!   path (`*.log` excludes `app.log` and `src/app.log`).
//!
//! The lease and activity directories are always excluded so the engine never
//! tries to lock its own bookkeeping files.

use crate::error::{AgentLockError, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Compiled exclusion patterns.
#[derive(Debug, Clone)]
pub struct PathFilter {
    /// Patterns matched against the full path, in configuration order.
    full: GlobSet,
    full_patterns: Vec<String>,
    /// Slash-free patterns, matched against the basename.
    basename: GlobSet,
    basename_patterns: Vec<String>,
}

impl PathFilter {
    /// Compile the filter from ordered exclusion patterns plus directories that
    /// are always excluded.
    ///
    /// # Returns
    ///
    /// * `Ok(PathFilter)` - All patterns compiled
    /// * `Err(AgentLockError::UserError)` - A pattern is not a valid glob
    pub fn new(patterns: &[String], reserved_dirs: &[String]) -> Result<Self> {
        let mut full = GlobSetBuilder::new();
        let mut full_patterns = Vec::new();
        let mut basename = GlobSetBuilder::new();
        let mut basename_patterns = Vec::new();

        for pattern in patterns {
            let trimmed = pattern.trim().trim_start_matches("./");
            if trimmed.is_empty() {
                continue;
            }

            full.add(compile(trimmed)?);
            full_patterns.push(pattern.clone());

            if !trimmed.contains('/') {
                basename.add(compile(trimmed)?);
                basename_patterns.push(pattern.clone());
            }
        }

        for dir in reserved_dirs {
            let dir = normalize(dir);
            let dir = dir.trim_end_matches('/');
            if dir.is_empty() {
                continue;
            }
            for pattern in [dir.to_string(), format!("{}/**", dir)] {
                full.add(compile(&pattern)?);
                full_patterns.push(pattern);
            }
        }

        Ok(Self {
            full: build(full)?,
            full_patterns,
            basename: build(basename)?,
            basename_patterns,
        })
    }

    /// Returns true when the path should be locked before mutation.
    ///
    /// An empty path is never lockable.
    pub fn is_lockable(&self, path: &str) -> bool {
        self.matched_pattern(path).is_none() && !normalize(path).is_empty()
    }

    /// Returns the first configured pattern that excludes `path`, if any.
    pub fn matched_pattern(&self, path: &str) -> Option<&str> {
        let path = normalize(path);

        if let Some(&idx) = self.full.matches(path.as_str()).first() {
            return Some(&self.full_patterns[idx]);
        }

        let name = path.rsplit('/').next().unwrap_or(&path);
        self.basename
            .matches(name)
            .first()
            .map(|&idx| self.basename_patterns[idx].as_str())
    }
}

fn compile(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| {
            AgentLockError::UserError(format!("invalid exclude pattern '{}': {}", pattern, e))
        })
}

fn build(builder: GlobSetBuilder) -> Result<GlobSet> {
    builder
        .build()
        .map_err(|e| AgentLockError::UserError(format!("failed to build exclude patterns: {}", e)))
}

/// Normalize separators and strip a leading `./`.
fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(patterns: &[&str]) -> PathFilter {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        PathFilter::new(&patterns, &[]).unwrap()
    }

    #[test]
    fn basename_pattern_matches_at_any_depth() {
        let f = filter(&["*.log"]);

        assert!(!f.is_lockable("app.log"));
        assert!(!f.is_lockable("src/app.log"));
        assert!(!f.is_lockable("deep/nested/dir/trace.log"));
        assert!(f.is_lockable("src/app.rs"));
        assert!(f.is_lockable("src/log/app.rs"));
    }

    #[test]
    fn slash_pattern_is_anchored_to_repo_root() {
        let f = filter(&[".git/**"]);

        assert!(!f.is_lockable(".git/config"));
        assert!(!f.is_lockable(".git/refs/heads/main"));
        assert!(f.is_lockable("vendor/.git/config"));
        assert!(f.is_lockable(".gitignore"));
    }

    #[test]
    fn single_star_does_not_cross_segments() {
        let f = filter(&["src/*.rs"]);

        assert!(!f.is_lockable("src/main.rs"));
        assert!(f.is_lockable("src/lease/store.rs"));
    }

    #[test]
    fn double_star_crosses_segments() {
        let f = filter(&["src/**/*.gen.rs"]);

        assert!(!f.is_lockable("src/a.gen.rs"));
        assert!(!f.is_lockable("src/a/b/c.gen.rs"));
        assert!(f.is_lockable("src/a/b/c.rs"));
    }

    #[test]
    fn no_patterns_locks_everything() {
        let f = filter(&[]);
        assert!(f.is_lockable("anything/at/all.txt"));
    }

    #[test]
    fn empty_path_is_not_lockable() {
        let f = filter(&[]);
        assert!(!f.is_lockable(""));
        assert!(!f.is_lockable("./"));
    }

    #[test]
    fn leading_dot_slash_and_backslashes_are_normalized() {
        let f = filter(&[".git/**", "*.log"]);

        assert!(!f.is_lockable("./.git/config"));
        assert!(!f.is_lockable("src\\app.log"));
    }

    #[test]
    fn reserved_dirs_are_always_excluded() {
        let f = PathFilter::new(&[], &[".agent-locks".to_string(), ".agent-activity/".to_string()])
            .unwrap();

        assert!(!f.is_lockable(".agent-locks/src%2Fmain.rs.lock"));
        assert!(!f.is_lockable(".agent-activity/agent-a.ndjson"));
        assert!(f.is_lockable(".agent-locksmith/file.rs"));
    }

    #[test]
    fn matched_pattern_reports_first_configured_match() {
        let f = filter(&["*.log", "logs/**"]);

        assert_eq!(f.matched_pattern("logs/app.log"), Some("logs/**"));
        assert_eq!(f.matched_pattern("app.log"), Some("*.log"));
        assert_eq!(f.matched_pattern("src/lib.rs"), None);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = PathFilter::new(&["src/[oops".to_string()], &[]).unwrap_err();
        assert!(matches!(err, AgentLockError::UserError(_)));
        assert!(err.to_string().contains("src/[oops"));
    }
}

//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{AgentLockError, Result};
use crate::filter::PathFilter;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentLockError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults when the file
    /// does not exist. A file that exists but fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // serde_yaml rejects an empty document; treat it as "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml).map_err(|e| {
            AgentLockError::UserError(format!("failed to parse config YAML: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            AgentLockError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `lock_timeout_secs`, hook timeouts and `acquire_poll_millis` must be positive
    /// - `acquire_wait_secs` must be shorter than `pre_hook_timeout_secs`
    /// - `lock_directory` and `activity_directory` must be non-empty relative paths
    /// - every `exclude_patterns` entry must compile as a glob
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("lock_timeout_secs", self.lock_timeout_secs),
            ("pre_hook_timeout_secs", self.pre_hook_timeout_secs),
            ("post_hook_timeout_secs", self.post_hook_timeout_secs),
            ("acquire_poll_millis", self.acquire_poll_millis),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(AgentLockError::UserError(format!(
                    "config validation failed: {} must be greater than 0",
                    name
                )));
            }
        }

        if self.acquire_wait_secs >= self.pre_hook_timeout_secs {
            return Err(AgentLockError::UserError(format!(
                "config validation failed: acquire_wait_secs ({}) must be less than pre_hook_timeout_secs ({})",
                self.acquire_wait_secs, self.pre_hook_timeout_secs
            )));
        }

        for (name, dir) in [
            ("lock_directory", &self.lock_directory),
            ("activity_directory", &self.activity_directory),
        ] {
            if dir.trim().is_empty() {
                return Err(AgentLockError::UserError(format!(
                    "config validation failed: {} must be non-empty",
                    name
                )));
            }
            if Path::new(dir).is_absolute() {
                return Err(AgentLockError::UserError(format!(
                    "config validation failed: {} must be relative to the repository root (found '{}')",
                    name, dir
                )));
            }
        }

        PathFilter::new(&self.exclude_patterns, &[])?;

        Ok(())
    }

    /// Lease lifetime as a chrono duration.
    pub fn lock_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lock_timeout_secs as i64)
    }

    /// Clock-skew tolerance as a chrono duration.
    pub fn clock_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.clock_skew_secs as i64)
    }

    /// Pre-operation hook deadline.
    pub fn pre_hook_timeout(&self) -> Duration {
        Duration::from_secs(self.pre_hook_timeout_secs)
    }

    /// Post-operation hook deadline.
    pub fn post_hook_timeout(&self) -> Duration {
        Duration::from_secs(self.post_hook_timeout_secs)
    }

    /// Wait budget for a held lease.
    pub fn acquire_wait(&self) -> Duration {
        Duration::from_secs(self.acquire_wait_secs)
    }

    /// Poll interval while waiting for a held lease.
    pub fn acquire_poll(&self) -> Duration {
        Duration::from_millis(self.acquire_poll_millis)
    }
}

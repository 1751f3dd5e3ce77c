//! Configuration types and defaults for agentlock.

use serde::{Deserialize, Serialize};

/// Default config file name, relative to the repository root.
pub const CONFIG_FILE_NAME: &str = ".agentlock.yaml";

/// What a hook decides when the lease store cannot be reached in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreFailurePolicy {
    /// Deny the operation (default; no edit happens without a lease).
    #[default]
    FailClosed,
    /// Let the operation proceed unlocked and log a warning.
    FailOpen,
}

/// Default exclusion patterns.
pub fn default_exclude_patterns() -> Vec<String> {
    vec![".git/**".to_string(), "*.log".to_string()]
}

// Default value functions for serde
pub(crate) fn default_lock_timeout_secs() -> u64 {
    600
}
pub(crate) fn default_lock_directory() -> String {
    ".agent-locks".to_string()
}
pub(crate) fn default_activity_directory() -> String {
    ".agent-activity".to_string()
}
pub(crate) fn default_pre_hook_timeout_secs() -> u64 {
    30
}
pub(crate) fn default_post_hook_timeout_secs() -> u64 {
    15
}
pub(crate) fn default_acquire_poll_millis() -> u64 {
    250
}

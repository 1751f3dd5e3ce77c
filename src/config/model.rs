//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for agentlock.
///
/// This struct represents the contents of `.agentlock.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Lease settings
    // =========================================================================
    /// Seconds a lease stays live after acquisition.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Extra seconds a lease is still honoured past its expiry, to absorb
    /// clock drift between agents.
    #[serde(default)]
    pub clock_skew_secs: u64,

    /// Lease directory, relative to the repository root.
    #[serde(default = "default_lock_directory")]
    pub lock_directory: String,

    /// Activity ledger directory, relative to the repository root.
    #[serde(default = "default_activity_directory")]
    pub activity_directory: String,

    /// Ordered glob patterns for paths that are never locked.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    // =========================================================================
    // Hook settings
    // =========================================================================
    /// Decision taken by the pre-operation hook when the store is unavailable.
    #[serde(default)]
    pub on_store_failure: StoreFailurePolicy,

    /// Upper bound on the pre-operation hook's work.
    #[serde(default = "default_pre_hook_timeout_secs")]
    pub pre_hook_timeout_secs: u64,

    /// Upper bound on the post-operation hook's work.
    #[serde(default = "default_post_hook_timeout_secs")]
    pub post_hook_timeout_secs: u64,

    /// How long the pre-operation hook keeps retrying a held lease (0 = no wait).
    #[serde(default)]
    pub acquire_wait_secs: u64,

    /// Delay between retries while waiting for a lease.
    #[serde(default = "default_acquire_poll_millis")]
    pub acquire_poll_millis: u64,

    // =========================================================================
    // Diagnostics
    // =========================================================================
    /// Emit debug-level logs on stderr.
    #[serde(default)]
    pub debug_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_timeout_secs: default_lock_timeout_secs(),
            clock_skew_secs: 0,
            lock_directory: default_lock_directory(),
            activity_directory: default_activity_directory(),
            exclude_patterns: default_exclude_patterns(),
            on_store_failure: StoreFailurePolicy::default(),
            pre_hook_timeout_secs: default_pre_hook_timeout_secs(),
            post_hook_timeout_secs: default_post_hook_timeout_secs(),
            acquire_wait_secs: 0,
            acquire_poll_millis: default_acquire_poll_millis(),
            debug_logging: false,
        }
    }
}

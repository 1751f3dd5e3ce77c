//! Pre- and post-operation hooks invoked by the host agent runtime.
//!
//! A hook reads one JSON payload from stdin, does its work against the lease
//! store and activity ledger, and answers with one [`HookDecision`] on stdout.
//! Hooks never fail the host: every error becomes a decision.

mod input;
mod post;
mod pre;

#[cfg(test)]
mod tests;

pub use input::{HookInput, resolve_agent_id};
pub use post::run_post;
pub use pre::run_pre;
pub(crate) use pre::resolve_failure;

use crate::config::{Config, StoreFailurePolicy};
use crate::context::WorkspaceContext;
use crate::error::{AgentLockError, Result};
use crate::exit_codes;
use crate::ledger::ActivityLedger;
use crate::lease::LockManager;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::time::Duration;

/// What the host should do with the tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Run the operation.
    Proceed,
    /// A lease is held elsewhere; retry later.
    Block,
    /// The lease store failed under the fail-closed policy.
    Deny,
}

/// The single JSON line a hook writes to stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookDecision {
    pub decision: Decision,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Repo-relative paths the decision covers.
    #[serde(default)]
    pub paths: Vec<String>,
}

impl HookDecision {
    pub fn proceed(paths: Vec<String>) -> Self {
        Self {
            decision: Decision::Proceed,
            reason: None,
            paths,
        }
    }

    pub fn block(reason: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            decision: Decision::Block,
            reason: Some(reason.into()),
            paths,
        }
    }

    pub fn deny(reason: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            decision: Decision::Deny,
            reason: Some(reason.into()),
            paths,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Process exit code the host runtime expects for this decision.
    pub fn exit_code(&self) -> i32 {
        match self.decision {
            Decision::Proceed => exit_codes::SUCCESS,
            Decision::Block | Decision::Deny => exit_codes::BLOCKED,
        }
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Everything a hook invocation needs, owned so it can move to a worker thread.
#[derive(Debug, Clone)]
pub struct HookRunner {
    pub ctx: WorkspaceContext,
    pub manager: LockManager,
    pub ledger: ActivityLedger,
    pub policy: StoreFailurePolicy,
    pub pre_timeout: Duration,
    pub post_timeout: Duration,
    pub acquire_wait: Duration,
    pub acquire_poll: Duration,
}

impl HookRunner {
    pub fn from_config(ctx: &WorkspaceContext, config: &Config) -> Result<Self> {
        Ok(Self {
            manager: LockManager::from_config(ctx, config)?,
            ledger: ActivityLedger::new(&ctx.activity_dir),
            ctx: ctx.clone(),
            policy: config.on_store_failure,
            pre_timeout: config.pre_hook_timeout(),
            post_timeout: config.post_hook_timeout(),
            acquire_wait: config.acquire_wait(),
            acquire_poll: config.acquire_poll(),
        })
    }

    /// Map payload paths to repo-relative form, dropping those outside the root.
    pub(crate) fn relative_paths(&self, raw: &[String]) -> Vec<String> {
        let mut paths = Vec::new();
        for path in raw {
            match self.ctx.relative_path(path) {
                Ok(rel) => {
                    if !paths.contains(&rel) {
                        paths.push(rel);
                    }
                }
                Err(e) => tracing::debug!(path = %path, error = %e, "ignoring target path"),
            }
        }
        paths
    }
}

/// Run `work` on a worker thread and wait at most `timeout` for it.
///
/// A missed deadline or a worker that dies without answering is reported as
/// `StoreUnavailable`. The worker is detached on timeout; it ends with the
/// process.
pub(crate) fn run_with_deadline<T, F>(label: &str, timeout: Duration, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name(format!("agentlock-{}", label))
        .spawn(move || {
            let _ = tx.send(work());
        })
        .map_err(|e| AgentLockError::store(format!("failed to start {} hook worker", label), e))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(AgentLockError::StoreUnavailable(format!(
            "{} hook timed out after {}s",
            label,
            timeout.as_secs_f64()
        ))),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(AgentLockError::StoreUnavailable(
            format!("{} hook worker exited without a result", label),
        )),
    }
}

//! Pre-operation hook: take leases on every target path before a mutation.

use super::{HookDecision, HookInput, HookRunner, run_with_deadline};
use crate::config::StoreFailurePolicy;
use crate::error::{AgentLockError, Result};
use crate::lease::{AcquireOutcome, LeaseGuard};
use crate::ledger::{OperationKind, Outcome};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Result of one all-or-nothing acquisition pass.
#[derive(Debug)]
enum PreOutcome {
    Granted,
    Blocked {
        path: String,
        owner_id: String,
        expires_at: DateTime<Utc>,
    },
}

/// Decide whether the operation described by `input` may run.
///
/// Read-like tools and payloads without lockable targets proceed untouched.
/// Store failures and a missed deadline are resolved by the configured
/// [`StoreFailurePolicy`].
pub fn run_pre(runner: &HookRunner, input: &HookInput) -> HookDecision {
    let Some(operation) = input.operation().filter(OperationKind::is_mutating) else {
        debug!(tool = %input.tool_name, "tool does not mutate files; no lease needed");
        return HookDecision::proceed(Vec::new());
    };

    let mut paths = runner.relative_paths(&input.target_paths());
    if paths.is_empty() {
        debug!(tool = %input.tool_name, "no target paths in payload");
        return HookDecision::proceed(paths);
    }
    // One global acquisition order, so agents with overlapping path sets
    // never each hold a path the other is waiting for.
    paths.sort();

    let agent_id = input.agent_id();
    let tool = input.tool_name.clone();
    let worker = runner.clone();
    let worker_paths = paths.clone();
    let worker_agent = agent_id.clone();

    let result = run_with_deadline("pre", runner.pre_timeout, move || {
        acquire_all(&worker, &worker_agent, &worker_paths, operation, &tool)
    });

    match result {
        Ok(PreOutcome::Granted) => HookDecision::proceed(paths),
        Ok(PreOutcome::Blocked {
            path,
            owner_id,
            expires_at,
        }) => HookDecision::block(
            format!(
                "{} is locked by {} until {}; retry after it is released",
                path,
                owner_id,
                expires_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            ),
            paths,
        ),
        Err(e) => resolve_failure(runner.policy, &agent_id, e, paths),
    }
}

/// Acquire every lockable path, rolling back this pass's grants on a denial.
fn acquire_all(
    runner: &HookRunner,
    agent_id: &str,
    paths: &[String],
    operation: OperationKind,
    tool: &str,
) -> Result<PreOutcome> {
    let manager = &runner.manager;
    let mut guards = Vec::new();
    let mut granted = Vec::new();

    for path in paths {
        if !manager.filter().is_lockable(path) {
            continue;
        }

        let held_before = manager
            .read(path)?
            .is_some_and(|lease| lease.owner_id == agent_id);

        match manager.acquire_with_wait(path, agent_id, runner.acquire_wait, runner.acquire_poll)? {
            AcquireOutcome::Granted(_) => {
                if !held_before {
                    guards.push(LeaseGuard::new(manager, path, agent_id));
                }
                granted.push(path.as_str());
            }
            AcquireOutcome::Skipped(_) => {}
            AcquireOutcome::Denied {
                owner_id,
                expires_at,
            } => {
                record(runner, agent_id, path, operation, Outcome::Denied, tool);
                // Dropping the guards releases what this pass acquired.
                drop(guards);
                return Ok(PreOutcome::Blocked {
                    path: path.clone(),
                    owner_id,
                    expires_at,
                });
            }
        }
    }

    for guard in guards {
        guard.keep();
    }
    for path in granted {
        record(runner, agent_id, path, operation, Outcome::Locked, tool);
    }
    Ok(PreOutcome::Granted)
}

/// Append to the ledger; failures are logged and never change the decision.
fn record(
    runner: &HookRunner,
    agent_id: &str,
    path: &str,
    operation: OperationKind,
    outcome: Outcome,
    tool: &str,
) {
    let tool = Some(tool).filter(|t| !t.is_empty());
    if let Err(e) = runner.ledger.record(agent_id, path, operation, outcome, tool) {
        warn!(path, agent_id, error = %e, "failed to record activity");
    }
}

/// Turn an error into a decision according to `policy`.
pub(crate) fn resolve_failure(
    policy: StoreFailurePolicy,
    agent_id: &str,
    err: AgentLockError,
    paths: Vec<String>,
) -> HookDecision {
    match policy {
        StoreFailurePolicy::FailClosed => {
            warn!(agent_id, error = %err, "lock check failed; denying operation");
            HookDecision::deny(format!("lock check failed: {}", err), paths)
        }
        StoreFailurePolicy::FailOpen => {
            warn!(agent_id, error = %err, "lock check failed; proceeding without lease");
            HookDecision::proceed(paths)
                .with_reason(format!("proceeding without lease: {}", err))
        }
    }
}

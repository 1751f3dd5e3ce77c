//! Post-operation hook: record what happened, then let go of the lease.

use super::{HookDecision, HookInput, HookRunner, run_with_deadline};
use crate::error::Result;
use crate::lease::ReleaseOutcome;
use crate::ledger::{OperationKind, Outcome};
use tracing::{debug, warn};

/// Record activity for every target path and release the caller's leases.
///
/// Always proceeds. A ledger failure on one path does not stop the release of
/// that path or the handling of the others.
pub fn run_post(runner: &HookRunner, input: &HookInput) -> HookDecision {
    let paths = runner.relative_paths(&input.target_paths());
    if paths.is_empty() {
        debug!(tool = %input.tool_name, "no target paths in payload");
        return HookDecision::proceed(paths);
    }

    let agent_id = input.agent_id();
    let operation = input.operation();
    let tool = input.tool_name.clone();
    let worker = runner.clone();
    let worker_paths = paths.clone();
    let worker_agent = agent_id.clone();

    let result = run_with_deadline("post", runner.post_timeout, move || {
        record_and_release(&worker, &worker_agent, &worker_paths, operation, &tool)
    });

    match result {
        Ok(()) => HookDecision::proceed(paths),
        Err(e) => {
            warn!(agent_id = %agent_id, error = %e, "post-operation hook failed");
            HookDecision::proceed(paths).with_reason(format!("post-operation cleanup failed: {}", e))
        }
    }
}

fn record_and_release(
    runner: &HookRunner,
    agent_id: &str,
    paths: &[String],
    operation: Option<OperationKind>,
    tool: &str,
) -> Result<()> {
    let manager = &runner.manager;
    let mut first_error = None;

    for path in paths {
        let lockable = manager.filter().is_lockable(path);

        let outcome = if !lockable {
            Outcome::Unlocked
        } else {
            match manager.read(path) {
                Ok(Some(lease)) if lease.owner_id == agent_id => Outcome::Released,
                Ok(_) => Outcome::Unlocked,
                Err(e) => {
                    warn!(path = %path, error = %e, "could not read lease before release");
                    Outcome::Unlocked
                }
            }
        };

        let tool = Some(tool).filter(|t| !t.is_empty());
        let recorded = match operation {
            Some(operation) => {
                if let Err(e) = runner.ledger.record(agent_id, path, operation, outcome, tool) {
                    warn!(path = %path, agent_id, error = %e, "failed to record activity; releasing anyway");
                }
                Some((operation, outcome))
            }
            None => {
                debug!(path = %path, tool, "untracked tool; activity not recorded");
                None
            }
        };

        if !lockable {
            continue;
        }
        let released = match manager.release(path, agent_id) {
            Ok(released) => released,
            Err(e) => {
                warn!(path = %path, agent_id, error = %e, "failed to release lease");
                if first_error.is_none() {
                    first_error = Some(e);
                }
                continue;
            }
        };

        // The lease can be reclaimed between the read above and the release.
        if let Some((operation, outcome)) = recorded
            && let Some(corrected) = settled_outcome(outcome, &released)
        {
            warn!(path = %path, agent_id, ?released, "lease was gone at release; correcting activity record");
            if let Err(e) = runner.ledger.record(agent_id, path, operation, corrected, tool) {
                warn!(path = %path, agent_id, error = %e, "failed to record activity correction");
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// The outcome to append when the recorded one turned out wrong at release.
pub(super) fn settled_outcome(recorded: Outcome, released: &ReleaseOutcome) -> Option<Outcome> {
    match (recorded, released) {
        (Outcome::Released, ReleaseOutcome::NotOwner { .. } | ReleaseOutcome::NoOp) => {
            Some(Outcome::Unlocked)
        }
        _ => None,
    }
}
